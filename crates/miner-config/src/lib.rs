//! Configuration loading for npm-miner
//!
//! This crate handles parsing and validation of miner.toml, layering
//! environment and command-line overrides on top of it, and turning the
//! `[retry]` section into a request queue policy.

pub mod schema;
pub mod merge;

// Re-export main types
pub use schema::{AttemptsKeyword, AttemptsSetting, MinerSection, MinerToml, RegistrySection, RetrySection};
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource};

use miner_core::error::MinerError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, MinerError>;
