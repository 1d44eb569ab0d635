//! `npm-miner mine` command implementation.
//!
//! Looks up every name in the names file, keeps packages hosted on GitHub
//! that were published within the active window, attaches their download
//! count for the year ending at the last publish and upserts the result.

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use miner_config::{MinerSection, RegistrySection};
use miner_core::error::{MinerError, MinerResult};
use miner_core::utils::{download_period, is_active, last_publish_time};
use miner_queue::{wrap, Pending, RetryPolicy};
use miner_registry::{ClientConfig, DownloadsResponse, NpmClient, PackageDocument};
use tracing::{debug, info, warn};

use super::CommandContext;
use crate::output::{ErrorFormatter, MiningProgress, OutputHandler, PackageOutcome};
use crate::store::{DocumentStore, JsonLinesStore, MemoryStore, PackageRecord};

/// A retried remote call
type Fetch<A, R> = Box<dyn Fn(A) -> Pending<R, MinerError> + Send + Sync>;

/// Execute the `npm-miner mine` command
pub async fn execute(names_file: Utf8PathBuf, dry_run: bool, ctx: &CommandContext) -> MinerResult<()> {
    let names_path = ctx.cwd.join(names_file);
    let names = load_names(&names_path).await?;
    ctx.output.info(&format!("Loaded {} package names from {}", names.len(), names_path));

    if dry_run {
        let store = Arc::new(MemoryStore::new());
        let progress = collect(&names, store.clone(), ctx).await?;
        ctx.output.success(&progress.summary());
        ctx.output.info(&format!(
            "Dry run: {} records collected, nothing written",
            store.count().await
        ));
    } else {
        let store = Arc::new(JsonLinesStore::open(&ctx.cwd.join(&ctx.config.miner.output)).await?);
        let progress = collect(&names, store.clone(), ctx).await?;
        ctx.output.success(&progress.summary());
        ctx.output.info(&format!("Records written to {}", store.path()));
    }

    Ok(())
}

async fn collect(
    names: &[String],
    store: Arc<dyn DocumentStore>,
    ctx: &CommandContext,
) -> MinerResult<MiningProgress> {
    let client = NpmClient::with_config(client_config(&ctx.config.registry))?;
    let miner = Miner::new(client, ctx.config.retry.to_policy(), store.clone(), &ctx.config.miner)?;

    info!(store = %store.describe(), total = names.len(), "Start collecting");
    Ok(miner.run(names, &ctx.output).await)
}

/// Read package names: a JSON array of strings, or one name per line
pub async fn load_names(path: &Utf8Path) -> MinerResult<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MinerError::io(format!("Failed to read names file {}", path), e))?;

    parse_names(&content).map_err(|e| match e {
        MinerError::JsonParse { message, .. } => MinerError::JsonParse {
            what: format!("names file {}", path),
            message,
        },
        other => other,
    })
}

/// Parse the contents of a names file
pub fn parse_names(content: &str) -> MinerResult<Vec<String>> {
    let trimmed = content.trim_start();

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| MinerError::JsonParse {
            what: "names file".to_string(),
            message: e.to_string(),
        });
    }

    Ok(trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// HTTP client settings from the `[registry]` section
pub fn client_config(registry: &RegistrySection) -> ClientConfig {
    ClientConfig {
        registry_url: registry.registry_url.clone(),
        downloads_url: registry.downloads_url.clone(),
        timeout: Duration::from_secs(registry.timeout_secs),
        user_agent: registry.user_agent.clone(),
    }
}

/// Mining pipeline over retried registry calls
pub struct Miner {
    get_package: Fetch<String, Option<PackageDocument>>,
    get_downloads: Fetch<(String, String), DownloadsResponse>,
    store: Arc<dyn DocumentStore>,
    batch_size: usize,
    window_days: u32,
    now: DateTime<Utc>,
}

impl Miner {
    /// Wrap both client calls with `policy`. Needs a running Tokio runtime.
    pub fn new(
        client: NpmClient,
        policy: RetryPolicy,
        store: Arc<dyn DocumentStore>,
        settings: &MinerSection,
    ) -> MinerResult<Self> {
        let package_client = client.clone();
        let get_package = wrap("get_package", policy.clone(), move |name: String| {
            let client = package_client.clone();
            async move { client.get_package(&name).await }
        })?;

        let get_downloads = wrap("get_downloads", policy, move |(name, period): (String, String)| {
            let client = client.clone();
            async move { client.get_downloads(&name, &period).await }
        })?;

        Ok(Self {
            get_package: Box::new(get_package),
            get_downloads: Box::new(get_downloads),
            store,
            batch_size: settings.batch_size.max(1),
            window_days: settings.active_window_days,
            now: Utc::now(),
        })
    }

    /// Process `names` batch by batch, printing progress after each batch
    pub async fn run(&self, names: &[String], output: &OutputHandler) -> MiningProgress {
        let mut progress = MiningProgress::new(names.len());

        for batch in names.chunks(self.batch_size) {
            let outcomes = join_all(batch.iter().map(|name| self.process_package(name, output))).await;
            for outcome in outcomes {
                progress.record(outcome);
            }

            output.info(&progress.to_string());
            info!(
                processed = progress.processed(),
                stored = progress.stored(),
                ignored = progress.ignored(),
                stale = progress.stale(),
                failed = progress.failed(),
                "Batch complete"
            );
        }

        progress
    }

    /// Mine one package; errors are reported and counted, never propagated
    pub async fn process_package(&self, name: &str, output: &OutputHandler) -> PackageOutcome {
        match self.mine_package(name).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(
                    package = name,
                    error = %error,
                    recoverable = error.is_recoverable(),
                    "Package failed"
                );
                let errors = ErrorFormatter::with_palette(output.palette());
                output.error(&errors.format_package_failure(name, &error));
                PackageOutcome::Failed
            },
        }
    }

    async fn mine_package(&self, name: &str) -> MinerResult<PackageOutcome> {
        debug!(package = name, "Fetching package");
        let Some(pkg) = (self.get_package)(name.to_string()).await? else {
            debug!(package = name, "Ignoring, not in registry");
            return Ok(PackageOutcome::Ignored);
        };

        let Some(github) = pkg.github_url().map(str::to_string) else {
            debug!(package = name, "Ignoring, not hosted on GitHub");
            return Ok(PackageOutcome::Ignored);
        };

        let Some(last) = last_publish_time(pkg.publish_times()) else {
            debug!(package = name, "Skipping, no publish time");
            return Ok(PackageOutcome::Stale);
        };
        if !is_active(last, self.now, self.window_days) {
            debug!(package = name, last_publish = %last, "Skipping, stale");
            return Ok(PackageOutcome::Stale);
        }

        let period = download_period(last, self.window_days);
        debug!(package = name, period = %period, "Fetching downloads");
        let downloads = match (self.get_downloads)((name.to_string(), period)).await?.into_point() {
            Ok(point) => point,
            Err(reason) => {
                debug!(package = name, reason = %reason, "Ignoring, no downloads");
                return Ok(PackageOutcome::Ignored);
            },
        };

        let record = PackageRecord {
            id: pkg.id.clone(),
            pkg,
            github,
            downloads,
        };
        if let Err(error) = self.store.upsert(record).await {
            warn!(package = name, error = %error, "Failed to store record");
        }

        Ok(PackageOutcome::Stored)
    }
}
