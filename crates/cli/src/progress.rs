//! Spinner feedback for sync attempts.

use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use pdfmonkey_core::watcher::{AttemptProgress, SyncReporter};
use pdfmonkey_core::SyncResult;

use crate::style;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// One spinner per in-flight attempt, all under a shared [`MultiProgress`].
#[derive(Default, Clone)]
pub struct SpinnerReporter {
    multi: MultiProgress,
}

impl SpinnerReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

struct SpinnerAttempt {
    bar: ProgressBar,
    label: String,
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

fn done_style() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Render the outcome line of an attempt.
pub fn outcome_line(label: &str, result: &SyncResult) -> String {
    match result {
        SyncResult::Synced => style::success(&format!("{} - synced!", label)),
        SyncResult::Failed { errors } => {
            let details: Vec<String> = errors.lines().map(|l| format!("    {}", l)).collect();
            style::error(&format!("{} - failed:\n{}", label, details.join("\n")))
        }
    }
}

impl SyncReporter for SpinnerReporter {
    fn begin(&self, label: &str) -> Box<dyn AttemptProgress> {
        let bar = self.multi.add(ProgressBar::new_spinner());
        bar.set_style(spinner_style());
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Box::new(SpinnerAttempt {
            bar,
            label: label.to_string(),
        })
    }
}

impl AttemptProgress for SpinnerAttempt {
    fn finish(self: Box<Self>, result: &SyncResult) {
        self.bar.set_style(done_style());
        self.bar.finish_with_message(outcome_line(&self.label, result));
    }
}
