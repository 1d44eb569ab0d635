//! Configuration lookup, fallback logic, and environment overrides

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use miner_core::error::MinerError;

use crate::schema::{load_from_file, validate_config, MinerToml};
use crate::ConfigResult;

/// Name of the configuration file looked up from the working directory
pub const CONFIG_FILE_NAME: &str = "miner.toml";

/// Environment variables that override configuration values
const ENV_KEYS: &[&str] = &[
    "DEBUG",
    "NPM_REGISTRY_URL",
    "NPM_DOWNLOADS_URL",
    "MINER_OUTPUT",
    "MINER_BATCH_SIZE",
];

/// Main configuration loading interface
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Configuration source tracking
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// File passed explicitly with --config
    Explicit(Utf8PathBuf),
    /// miner.toml found in the working directory or a parent
    Project(Utf8PathBuf),
    /// No file found, built-in defaults
    Defaults,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new(cwd: Utf8PathBuf) -> Self {
        Self { cwd }
    }

    /// Load configuration from `explicit`, else from the nearest miner.toml,
    /// else fall back to defaults
    pub async fn load(&self, explicit: Option<&Utf8Path>) -> ConfigResult<(MinerToml, ConfigSource)> {
        if let Some(path) = explicit {
            let path = self.cwd.join(path);
            if !path.exists() {
                return Err(MinerError::ConfigValidation {
                    field: "config".to_string(),
                    reason: format!("Configuration file {} does not exist", path),
                });
            }
            let config = load_from_file(&path).await?;
            return Ok((config, ConfigSource::Explicit(path)));
        }

        if let Some(path) = self.resolve_config_path(CONFIG_FILE_NAME) {
            let config = load_from_file(&path).await?;
            return Ok((config, ConfigSource::Project(path)));
        }

        Ok((MinerToml::default(), ConfigSource::Defaults))
    }

    /// Find configuration file in project (walks up directory tree)
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(filename);
            if config_path.is_file() {
                return Some(config_path);
            }
            current = dir.parent();
        }

        None
    }
}

impl ConfigLayering {
    /// Merge file configuration with environment and CLI overrides, then
    /// validate the result
    pub fn merge_configs(
        file_config: MinerToml,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<MinerToml> {
        let mut merged = file_config;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut merged, &env_overrides)?;

        // Apply CLI flag overrides (highest priority)
        Self::apply_cli_overrides(&mut merged, &cli_overrides)?;

        validate_config(&merged)?;
        Ok(merged)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: &mut MinerToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "DEBUG" => {
                    config.miner.debug = value.trim().eq_ignore_ascii_case("true");
                },
                "NPM_REGISTRY_URL" => {
                    config.registry.registry_url = value.clone();
                },
                "NPM_DOWNLOADS_URL" => {
                    config.registry.downloads_url = value.clone();
                },
                "MINER_OUTPUT" => {
                    config.miner.output = Utf8PathBuf::from(value);
                },
                "MINER_BATCH_SIZE" => {
                    config.miner.batch_size = parse_batch_size(key, value)?;
                },
                _ => {
                    // Unknown environment variable, ignore
                },
            }
        }

        Ok(())
    }

    /// Apply CLI flag overrides
    fn apply_cli_overrides(config: &mut MinerToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "output" => {
                    config.miner.output = Utf8PathBuf::from(value);
                },
                "batch_size" => {
                    config.miner.batch_size = parse_batch_size("--batch-size", value)?;
                },
                "debug" => {
                    config.miner.debug = value == "true";
                },
                _ => {
                    // Unknown CLI override, ignore
                },
            }
        }

        Ok(())
    }

    /// Collect environment variable overrides
    pub fn collect_env_overrides() -> HashMap<String, String> {
        Self::collect_overrides_from(std::env::vars())
    }

    /// Keep only the variables this tool understands
    pub fn collect_overrides_from<I>(vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter(|(key, _)| ENV_KEYS.contains(&key.as_str()))
            .collect()
    }
}

fn parse_batch_size(field: &str, value: &str) -> ConfigResult<usize> {
    value.trim().parse().map_err(|e| MinerError::ConfigValidation {
        field: field.to_string(),
        reason: format!("'{}' is not a valid batch size: {}", value, e),
    })
}
