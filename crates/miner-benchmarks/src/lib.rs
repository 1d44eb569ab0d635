//! npm-miner benchmarking suite
//!
//! Benchmarks for the request queue hot paths and configuration loading.

pub mod common;

pub use common::*;
