//! npm API clients for npm-miner
//!
//! This crate fetches full package documents from the npm registry and
//! point download counts from the npm downloads API. It does not retry on
//! its own; callers wrap these operations in a retry queue.

pub mod api;
pub mod client;

// Re-export main types
pub use api::{DownloadsPoint, DownloadsResponse, PackageDocument, RepositoryField};
pub use client::{ClientConfig, NpmClient};

use miner_core::error::MinerError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, MinerError>;
