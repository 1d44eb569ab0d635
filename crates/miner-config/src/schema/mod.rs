//! miner.toml schema, parsing and validation

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use miner_core::error::MinerError;
use miner_queue::{Backoff, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::ConfigResult;

/// Longest accepted activity window, roughly a century
pub const MAX_ACTIVE_WINDOW_DAYS: u32 = 36_500;

/// Complete miner.toml configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerToml {
    /// Remote API endpoints and HTTP client settings
    pub registry: RegistrySection,

    /// Retry policy applied to every remote call
    pub retry: RetrySection,

    /// Mining run settings
    pub miner: MinerSection,
}

/// `[registry]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Package metadata API
    pub registry_url: String,

    /// Download statistics API
    pub downloads_url: String,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            registry_url: "https://registry.npmjs.org".to_string(),
            downloads_url: "https://api.npmjs.org".to_string(),
            timeout_secs: 30,
            user_agent: format!("npm-miner/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// `[retry]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Attempts per call: a positive number, or "unlimited"
    pub attempts: AttemptsSetting,

    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,

    /// Growth factor between consecutive delays
    pub multiplier: f64,

    /// Optional ceiling on a single delay, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            attempts: AttemptsSetting::Count(5),
            base_delay_ms: 1000,
            multiplier: 4.0,
            max_delay_ms: None,
        }
    }
}

/// Value of `retry.attempts`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttemptsSetting {
    /// Fixed number of attempts
    Count(u32),
    /// Named setting
    Keyword(AttemptsKeyword),
}

/// Named values accepted for `retry.attempts`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptsKeyword {
    /// Retry until the call succeeds
    Unlimited,
}

impl RetrySection {
    /// Build the request queue policy described by this section
    pub fn to_policy(&self) -> RetryPolicy {
        let mut backoff = Backoff::new(Duration::from_millis(self.base_delay_ms), self.multiplier);
        if let Some(max_delay_ms) = self.max_delay_ms {
            backoff = backoff.with_max_delay(Duration::from_millis(max_delay_ms));
        }

        match self.attempts {
            AttemptsSetting::Count(count) => RetryPolicy::new(count, backoff),
            AttemptsSetting::Keyword(AttemptsKeyword::Unlimited) => RetryPolicy::unlimited(backoff),
        }
    }
}

/// `[miner]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerSection {
    /// Packages processed concurrently before the next batch starts
    pub batch_size: usize,

    /// Packages not published within this many days are skipped; also the
    /// length of the download period
    pub active_window_days: u32,

    /// JSON lines file records are written to
    pub output: Utf8PathBuf,

    /// Verbose logging
    pub debug: bool,
}

impl Default for MinerSection {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            active_window_days: 365,
            output: Utf8PathBuf::from("npm-packages.jsonl"),
            debug: false,
        }
    }
}

/// Parse TOML string to MinerToml configuration
pub fn parse_miner_toml(content: &str) -> ConfigResult<MinerToml> {
    // First try with toml_edit for better error reporting
    content
        .parse::<toml_edit::DocumentMut>()
        .map_err(|e| toml_error(content, e.message(), e.span()))?;

    // Then parse with serde for type safety
    let config: MinerToml =
        toml::from_str(content).map_err(|e| toml_error(content, e.message(), e.span()))?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize MinerToml to TOML string
pub fn serialize_miner_toml(config: &MinerToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| MinerError::TomlParse {
        message: format!("TOML serialization error: {}", e),
        line: 0,
        column: 0,
    })
}

/// Validate configuration values
pub fn validate_config(config: &MinerToml) -> ConfigResult<()> {
    validate_url("registry.registry_url", &config.registry.registry_url)?;
    validate_url("registry.downloads_url", &config.registry.downloads_url)?;

    if config.registry.timeout_secs == 0 {
        return Err(MinerError::ConfigValidation {
            field: "registry.timeout_secs".to_string(),
            reason: "timeout must be at least one second".to_string(),
        });
    }

    if config.retry.attempts == AttemptsSetting::Count(0) {
        return Err(MinerError::ConfigValidation {
            field: "retry.attempts".to_string(),
            reason: "must be a positive number or \"unlimited\"".to_string(),
        });
    }

    config
        .retry
        .to_policy()
        .validate()
        .map_err(|e| MinerError::ConfigValidation {
            field: "retry".to_string(),
            reason: e.to_string(),
        })?;

    if config.miner.batch_size == 0 {
        return Err(MinerError::ConfigValidation {
            field: "miner.batch_size".to_string(),
            reason: "batch size must be greater than zero".to_string(),
        });
    }

    if config.miner.active_window_days == 0 {
        return Err(MinerError::ConfigValidation {
            field: "miner.active_window_days".to_string(),
            reason: "window must cover at least one day".to_string(),
        });
    }

    if config.miner.active_window_days > MAX_ACTIVE_WINDOW_DAYS {
        return Err(MinerError::ConfigValidation {
            field: "miner.active_window_days".to_string(),
            reason: format!(
                "window must not exceed {} days, got {}",
                MAX_ACTIVE_WINDOW_DAYS, config.miner.active_window_days
            ),
        });
    }

    Ok(())
}

/// Load and parse miner.toml from file path
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<MinerToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MinerError::io(format!("Failed to read {}", path), e))?;

    parse_miner_toml(&content).map_err(|e| match e {
        MinerError::TomlParse {
            message,
            line,
            column,
        } => MinerError::TomlParse {
            message: format!("In file {}: {}", path, message),
            line,
            column,
        },
        other => other,
    })
}

fn validate_url(field: &str, value: &str) -> ConfigResult<()> {
    let url = url::Url::parse(value).map_err(|e| MinerError::ConfigValidation {
        field: field.to_string(),
        reason: format!("'{}' is not a valid URL: {}", value, e),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(MinerError::ConfigValidation {
            field: field.to_string(),
            reason: format!("'{}' must use http or https", value),
        });
    }

    Ok(())
}

fn toml_error(content: &str, message: &str, span: Option<std::ops::Range<usize>>) -> MinerError {
    let (line, column) = span
        .map(|span| line_column(content, span.start))
        .unwrap_or((0, 0));

    MinerError::TomlParse {
        message: message.trim().to_string(),
        line,
        column,
    }
}

/// 1-based line and column of a byte offset
fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let before = &content.as_bytes()[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    (line, offset - line_start + 1)
}
