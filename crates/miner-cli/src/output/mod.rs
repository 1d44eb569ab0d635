//! Terminal output for commands.
//!
//! Regular output goes to stdout; errors and per-package failures go to
//! stderr so they survive `> log.txt`.

pub mod colors;
pub mod errors;
pub mod progress;

pub use colors::Palette;
pub use errors::ErrorFormatter;
pub use progress::{MiningProgress, PackageOutcome};

/// Output handler shared by all commands
pub struct OutputHandler {
    palette: Palette,
    quiet: bool,
}

impl OutputHandler {
    pub fn new() -> Self {
        Self {
            palette: Palette::detect(),
            quiet: false,
        }
    }

    /// Handler that prints nothing, for tests
    #[cfg(test)]
    pub fn silent() -> Self {
        Self {
            palette: Palette::plain(),
            quiet: true,
        }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    pub fn info(&self, message: &str) {
        if !self.quiet {
            println!("{}", message);
        }
    }

    pub fn success(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", self.palette.green("✓"), message);
        }
    }

    pub fn warn(&self, message: &str) {
        if !self.quiet {
            println!("{} {}", self.palette.yellow("⚠"), message);
        }
    }

    pub fn error(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", message);
        }
    }

    /// Key/value line used by `check-config` and `version`
    pub fn field(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("{} {}", self.palette.dim(&format!("{:>14}", key)), value);
        }
    }
}

impl Default for OutputHandler {
    fn default() -> Self {
        Self::new()
    }
}
