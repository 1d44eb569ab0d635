//! Command implementations and dispatch.
//!
//! Configuration is resolved once, before dispatch, so every command sees
//! the same merged settings.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use miner_config::{AttemptsSetting, ConfigLayering, ConfigLoader, ConfigSource, MinerToml};
use miner_core::error::{MinerError, MinerResult};
use tracing::info;

pub mod mine;


use crate::output::OutputHandler;
use crate::Commands;

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
    pub config: MinerToml,
    pub config_source: ConfigSource,
}

impl CommandContext {
    /// Resolve configuration from `config_path` (or the nearest miner.toml),
    /// then layer environment and `cli_overrides` on top
    pub async fn load(
        config_path: Option<&Utf8Path>,
        cli_overrides: HashMap<String, String>,
    ) -> MinerResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| MinerError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|path| MinerError::ConfigValidation {
            field: "cwd".to_string(),
            reason: format!("{} is not valid UTF-8", path.display()),
        })?;

        let (file_config, config_source) = ConfigLoader::new(cwd.clone()).load(config_path).await?;
        let config = ConfigLayering::merge_configs(
            file_config,
            ConfigLayering::collect_env_overrides(),
            cli_overrides,
        )?;

        Ok(Self {
            cwd,
            output: OutputHandler::new(),
            config,
            config_source,
        })
    }
}

/// Flags of `command` that override configuration values
pub fn cli_overrides(command: &Commands) -> HashMap<String, String> {
    let mut overrides = HashMap::new();

    if let Commands::Mine { output, batch_size, .. } = command {
        if let Some(output) = output {
            overrides.insert("output".to_string(), output.to_string());
        }
        if let Some(batch_size) = batch_size {
            overrides.insert("batch_size".to_string(), batch_size.to_string());
        }
    }

    overrides
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> MinerResult<()> {
    match command {
        Commands::Mine { names_file, dry_run, .. } => {
            info!("Mining packages from {} (dry_run: {})", names_file, dry_run);
            mine::execute(names_file, dry_run, ctx).await
        },
        Commands::CheckConfig => {
            info!("Checking configuration");
            check_config(ctx).await
        },
        Commands::Version => {
            info!("Showing version information");
            show_version(ctx).await
        },
    }
}

/// Print the effective configuration
pub async fn check_config(ctx: &CommandContext) -> MinerResult<()> {
    let config = &ctx.config;
    let source = match &ctx.config_source {
        ConfigSource::Explicit(path) | ConfigSource::Project(path) => path.to_string(),
        ConfigSource::Defaults => "built-in defaults".to_string(),
    };

    ctx.output.field("source", &source);
    ctx.output.field("registry", &config.registry.registry_url);
    ctx.output.field("downloads", &config.registry.downloads_url);
    ctx.output.field("timeout", &format!("{}s", config.registry.timeout_secs));
    ctx.output.field("attempts", &describe_attempts(config.retry.attempts));
    ctx.output.field("delays", &describe_delays(config));
    ctx.output.field("batch size", &config.miner.batch_size.to_string());
    ctx.output.field("active window", &format!("{} days", config.miner.active_window_days));
    ctx.output.field("output", config.miner.output.as_str());
    ctx.output.field("debug", &config.miner.debug.to_string());

    ctx.output.success("Configuration is valid");
    Ok(())
}

fn describe_attempts(attempts: AttemptsSetting) -> String {
    match attempts {
        AttemptsSetting::Count(count) => count.to_string(),
        AttemptsSetting::Keyword(_) => "unlimited".to_string(),
    }
}

/// Retry delays of the configured policy, at most four of them
fn describe_delays(config: &MinerToml) -> String {
    let policy = config.retry.to_policy();
    let retries = match config.retry.attempts {
        AttemptsSetting::Count(count) => Some(count.saturating_sub(1)),
        AttemptsSetting::Keyword(_) => None,
    };
    let shown = retries.map_or(4, |retries| retries.min(4));

    if shown == 0 {
        return "none".to_string();
    }

    let mut delays: Vec<String> = (0..shown)
        .map(|retry| format!("{}ms", policy.delay_for(retry).as_millis()))
        .collect();
    if retries.map_or(true, |retries| retries > shown) {
        delays.push("...".to_string());
    }
    delays.join(", ")
}

async fn show_version(ctx: &CommandContext) -> MinerResult<()> {
    let palette = ctx.output.palette();
    let target = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    ctx.output.info(&palette.bold(&format!("npm-miner v{}", env!("CARGO_PKG_VERSION"))));
    ctx.output.field("built", env!("BUILD_DATE"));
    ctx.output.field("target", &target);
    ctx.output.field("rust", env!("RUSTC_VERSION"));

    Ok(())
}
