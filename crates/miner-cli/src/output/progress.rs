//! Running totals of a mining run.

use std::fmt;
use std::time::{Duration, Instant};

/// What happened to one package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageOutcome {
    /// Record written (or handed to the store)
    Stored,
    /// Unknown to the registry, not on GitHub, or without download data
    Ignored,
    /// Last publish older than the active window
    Stale,
    /// An error escaped the retried calls
    Failed,
}

/// Counters reported after every batch
#[derive(Debug, Clone)]
pub struct MiningProgress {
    total: usize,
    stored: usize,
    ignored: usize,
    stale: usize,
    failed: usize,
    started: Instant,
}

impl MiningProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            stored: 0,
            ignored: 0,
            stale: 0,
            failed: 0,
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, outcome: PackageOutcome) {
        match outcome {
            PackageOutcome::Stored => self.stored += 1,
            PackageOutcome::Ignored => self.ignored += 1,
            PackageOutcome::Stale => self.stale += 1,
            PackageOutcome::Failed => self.failed += 1,
        }
    }

    /// Packages with any outcome so far
    pub fn processed(&self) -> usize {
        self.stored + self.ignored + self.stale + self.failed
    }

    /// Whole percentage of names processed; 100 for an empty run
    pub fn percent(&self) -> usize {
        if self.total == 0 {
            100
        } else {
            self.processed() * 100 / self.total
        }
    }

    pub fn stored(&self) -> usize {
        self.stored
    }

    pub fn ignored(&self) -> usize {
        self.ignored
    }

    pub fn stale(&self) -> usize {
        self.stale
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Final report line
    pub fn summary(&self) -> String {
        format!(
            "Processed {} packages in {:.2}s: {} stored, {} ignored, {} stale, {} failed",
            self.processed(),
            self.elapsed().as_secs_f64(),
            self.stored,
            self.ignored,
            self.stale,
            self.failed
        )
    }
}

impl fmt::Display for MiningProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}% (failed {}, ignored {}, stale {})",
            self.percent(),
            self.failed,
            self.ignored,
            self.stale
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line() {
        let mut progress = MiningProgress::new(8);
        progress.record(PackageOutcome::Stored);
        progress.record(PackageOutcome::Ignored);
        progress.record(PackageOutcome::Ignored);
        progress.record(PackageOutcome::Stale);
        progress.record(PackageOutcome::Failed);

        assert_eq!(progress.processed(), 5);
        assert_eq!(progress.to_string(), "62% (failed 1, ignored 2, stale 1)");
    }

    #[test]
    fn test_empty_run_is_complete() {
        let progress = MiningProgress::new(0);
        assert_eq!(progress.to_string(), "100% (failed 0, ignored 0, stale 0)");
        assert!(progress.summary().starts_with("Processed 0 packages in "));
    }
}
