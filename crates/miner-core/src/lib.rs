//! # miner-core
//!
//! Core types and utilities shared across all npm-miner crates.
//!
//! This crate provides:
//! - MinerError enum for unified error handling
//! - Date helpers for publish times and download periods
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `error`: Error types and result aliases
//! - `utils`: Utility functions and helpers

pub mod error;
pub mod utils;

// Re-export commonly used types
pub use error::{MinerError, MinerResult};
