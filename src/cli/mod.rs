//! Command implementations for the `pr-land` binary

pub mod check_target;
pub mod context;
pub mod discover;
pub mod merge;
pub mod style;

use indicatif::ProgressBar;
use pr_land::conflicts::DiscoveryProgress;
use pr_land::types::ConflictCandidate;
use std::time::Duration;
use style::spinner_style;

/// Spinner reporting conflict discovery progress
pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    /// Single-line spinner, drawn once evaluation starts
    pub fn compact() -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(spinner_style());
        Self { bar }
    }
}

impl DiscoveryProgress for CliProgress {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar
            .set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_candidate(&self, candidate: &ConflictCandidate) {
        self.bar.inc(1);
        self.bar.set_message(format!(
            "Checking #{} ({}/{})",
            candidate.number,
            self.bar.position(),
            self.bar.length().unwrap_or_default()
        ));
    }

    fn on_finish(&self) {
        self.bar.finish_and_clear();
    }
}
