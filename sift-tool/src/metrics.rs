//! Run metrics and summary
//!
//! One [`ProcessingMetrics`] is created per run, mutated by every page, and
//! read once at the end to print the summary.

use serde::Serialize;
use sift_common::human_time::format_elapsed;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

/// Errors listed individually in the summary; the rest are counted
pub const ERROR_DISPLAY_LIMIT: usize = 10;
/// Sample changes kept for the summary
pub const SAMPLE_LIMIT: usize = 20;

/// Counters for a single run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingMetrics {
    /// Items returned by the store, valid or not
    pub total_records: usize,
    /// Valid records handed to the policy
    pub processed_records: usize,
    /// Records classified as a change
    pub changed_records: usize,
    /// Records lacking the field the policy needs
    pub missing_field_records: usize,
    /// Pages fetched
    pub batches_processed: usize,
    /// Records sent to bulk upsert
    pub upserted: usize,
    /// Identifiers sent to bulk delete
    pub deleted: usize,
    /// Error descriptions in the order they occurred
    pub errors: Vec<String>,
    /// Sample change descriptions for display
    pub samples: Vec<String>,
}

impl ProcessingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn record_sample(&mut self, sample: impl Into<String>) {
        if self.samples.len() < SAMPLE_LIMIT {
            self.samples.push(sample.into());
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// "N changed of M processed, K errors"
    pub fn display_string(&self) -> String {
        format!(
            "{} changed of {} processed, {} errors",
            self.changed_records,
            self.processed_records,
            self.errors.len()
        )
    }
}

/// Final outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub policy: String,
    pub index: String,
    pub dry_run: bool,
    pub read_only: bool,
    pub metrics: ProcessingMetrics,
    pub elapsed: Duration,
    /// Set when the run aborted; metrics then cover the pages that completed
    pub failure: Option<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Render the user-facing summary
    pub fn render(&self) -> String {
        let m = &self.metrics;
        let mut out = String::new();
        let status = if self.succeeded() { "completed" } else { "FAILED" };
        let _ = writeln!(out, "\n=== {} on '{}' {} ===", self.policy, self.index, status);
        let _ = writeln!(out, "  Records scanned:      {}", m.total_records);
        let _ = writeln!(out, "  Records processed:    {}", m.processed_records);
        let label = if self.read_only { "Matches" } else { "Records changed" };
        let _ = writeln!(out, "  {:<22}{}", format!("{}:", label), m.changed_records);
        let _ = writeln!(out, "  Missing field:        {}", m.missing_field_records);
        let _ = writeln!(out, "  Pages:                {}", m.batches_processed);
        if !self.dry_run && !self.read_only {
            let _ = writeln!(out, "  Upserted:             {}", m.upserted);
            let _ = writeln!(out, "  Deleted:              {}", m.deleted);
        }
        let _ = writeln!(out, "  Errors:               {}", m.errors.len());
        let _ = writeln!(out, "  Elapsed:              {}", format_elapsed(self.elapsed));

        if !m.samples.is_empty() {
            let _ = writeln!(out, "\n  Examples:");
            for sample in &m.samples {
                let _ = writeln!(out, "    {}", sample);
            }
            if m.changed_records > m.samples.len() {
                let _ = writeln!(out, "    ... and {} more", m.changed_records - m.samples.len());
            }
        }

        if !m.errors.is_empty() {
            let _ = writeln!(out, "\n  Errors:");
            for error in m.errors.iter().take(ERROR_DISPLAY_LIMIT) {
                let _ = writeln!(out, "    - {}", error);
            }
            if m.errors.len() > ERROR_DISPLAY_LIMIT {
                let _ = writeln!(out, "    ... and {} more", m.errors.len() - ERROR_DISPLAY_LIMIT);
            }
        }

        if let Some(failure) = &self.failure {
            let _ = writeln!(out, "\n  Run aborted: {}", failure);
            let _ = writeln!(out, "  Writes from completed pages remain applied.");
        }

        if self.dry_run && !self.read_only {
            let _ = writeln!(out, "\n  DRY RUN: no changes were applied.");
            let _ = writeln!(out, "  Re-run with --execute to apply these changes.");
        }
        out
    }
}

/// Wall-clock timer for a run
#[derive(Debug, Clone, Copy)]
pub struct RunTimer(Instant);

impl RunTimer {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}
