//! Rendering of top-level errors with hints and their cause chain.

use std::error::Error;

use miner_core::error::MinerError;

use super::colors::Palette;

/// Formats errors that abort a command
pub struct ErrorFormatter {
    palette: Palette,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self::with_palette(Palette::detect())
    }

    pub fn with_palette(palette: Palette) -> Self {
        Self { palette }
    }

    /// Message, optional `help:` line, then one `caused by:` line per source
    pub fn format_error(&self, error: &MinerError) -> String {
        let mut output = format!("{}: {}\n", self.palette.red("error"), error);

        if let Some(suggestion) = error.suggestion() {
            output.push_str(&format!("{}: {}\n", self.palette.dim("help"), suggestion));
        }

        let mut source = error.source();
        while let Some(cause) = source {
            output.push_str(&format!("{}: {}\n", self.palette.dim("caused by"), cause));
            source = cause.source();
        }

        output
    }

    /// One-line failure report for a single package
    pub fn format_package_failure(&self, name: &str, error: &MinerError) -> String {
        format!("{} {}: {}", self.palette.red("failed"), name, error)
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}
