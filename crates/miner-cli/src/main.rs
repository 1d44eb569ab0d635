//! # npm-miner
//!
//! Collects npm packages hosted on GitHub together with their yearly
//! download counts.
//!
//! Every registry call goes through a retrying request queue, so transient
//! registry failures cost a delay rather than a package.

use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use miner_core::error::{MinerError, MinerResult};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod store;

use commands::CommandContext;
use output::ErrorFormatter;

/// Collect GitHub-hosted npm packages and their download counts
#[derive(Parser)]
#[command(name = "npm-miner", version, about = "Mine the npm registry for GitHub-hosted packages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the nearest miner.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect packages listed in a names file
    Mine {
        /// One package name per line, or a JSON array of names
        #[arg(value_name = "NAMES_FILE")]
        names_file: Utf8PathBuf,
        /// JSON lines file to write records to
        #[arg(short, long, value_name = "PATH")]
        output: Option<Utf8PathBuf>,
        /// Packages processed concurrently per batch
        #[arg(short, long)]
        batch_size: Option<usize>,
        /// Fetch everything but keep records in memory
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the effective configuration
    CheckConfig,
    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_panic_handler();

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprint!("{}", ErrorFormatter::new().format_error(&err));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> MinerResult<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| MinerError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let overrides = commands::cli_overrides(&cli.command);
        let ctx = CommandContext::load(cli.config.as_deref(), overrides).await?;

        setup_logging(cli.verbose || ctx.config.miner.debug, cli.json_logs);
        info!("Starting npm-miner v{}", env!("CARGO_PKG_VERSION"));

        commands::dispatch_command(cli.command, &ctx).await
    })
}

fn setup_logging(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("MINER_LOG").unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "npm_miner={level},miner_queue={level},miner_registry={level},miner_config={level}",
            level = level
        ))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        let thread = std::thread::current();
        match crash_banner(thread.name()) {
            Some(banner) => {
                error!("npm-miner encountered an unexpected error: {}", panic_info);
                eprintln!("{}", banner);
                eprintln!("Error: {}", panic_info);
            },
            // Worker panics surface as failed packages through the queue
            None => error!(thread = thread.name().unwrap_or("unnamed"), "Task panicked: {}", panic_info),
        }
    }));
}

/// Banner printed for a panic on `thread`; only the main thread crashes the run
fn crash_banner(thread: Option<&str>) -> Option<&'static str> {
    (thread == Some("main")).then_some("npm-miner crashed! This is a bug.")
}
