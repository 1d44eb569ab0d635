//! Utility functions and helpers.
//!
//! Common functionality used across multiple npm-miner crates.

pub mod time;

// Re-export commonly used utilities
pub use time::{download_period, format_date, is_active, last_publish_time};
