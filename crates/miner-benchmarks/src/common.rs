//! Common utilities for benchmarks

use std::time::Duration;

use criterion::Criterion;
use miner_core::error::MinerError;
use miner_queue::{Backoff, RetryPolicy};
use tokio::runtime::Runtime;

/// Criterion settings shared by every bench
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_secs(3))
        .measurement_time(Duration::from_secs(10))
        .sample_size(100)
}

/// Multi-threaded runtime for async benches
pub fn bench_runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| panic!("failed to build benchmark runtime: {}", e))
}

/// Policy whose retries cost no waiting
pub fn zero_delay_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Backoff::new(Duration::ZERO, 1.0))
}

/// Operation that succeeds immediately
pub async fn instant_ok(value: u64) -> Result<u64, MinerError> {
    Ok(value)
}

/// Operation that fails for odd values and succeeds otherwise
pub async fn fail_odd(value: u64) -> Result<u64, MinerError> {
    if value % 2 == 1 {
        Err(MinerError::Network {
            message: format!("value {} rejected", value),
            source: None,
        })
    } else {
        Ok(value)
    }
}
