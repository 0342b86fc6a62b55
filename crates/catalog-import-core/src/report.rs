//! Import run report.
//!
//! A [`ReportBuilder`] accumulates per-row outcomes during a run and is
//! consumed by [`ReportBuilder::finish`] into an immutable [`ImportReport`].
//! Only the first `max_error_samples` error messages are kept; later errors
//! are still counted.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default number of error messages kept in a report.
pub const DEFAULT_MAX_ERROR_SAMPLES: usize = 5;

/// Outcome of one import run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    imported_count: usize,
    error_count: usize,
    error_messages: Vec<String>,
    skipped_count: usize,
    not_started_count: usize,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl ImportReport {
    /// Rows persisted successfully.
    pub fn imported_count(&self) -> usize {
        self.imported_count
    }

    /// Rows that failed at any point after passing the mandatory-field check.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Capped, source-ordered sample of formatted error messages.
    pub fn error_messages(&self) -> &[String] {
        &self.error_messages
    }

    /// Rows skipped for missing `Name` or `Slug`. Not part of either tally.
    pub fn skipped_count(&self) -> usize {
        self.skipped_count
    }

    /// Rows never started because the run deadline elapsed.
    pub fn not_started_count(&self) -> usize {
        self.not_started_count
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// One-line human summary of the run.
    pub fn summary(&self) -> String {
        let mut message = if self.error_count == 0 {
            format!("Successfully imported {} products", self.imported_count)
        } else {
            format!(
                "Imported {} products, {} failed",
                self.imported_count, self.error_count
            )
        };
        if self.not_started_count > 0 {
            message.push_str(&format!(
                " ({} not started before the deadline)",
                self.not_started_count
            ));
        }
        message
    }
}

/// Accumulates row outcomes for an [`ImportReport`].
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    max_error_samples: usize,
    imported_count: usize,
    error_count: usize,
    error_messages: Vec<String>,
    skipped_count: usize,
    not_started_count: usize,
    started_at: DateTime<Utc>,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ERROR_SAMPLES)
    }
}

impl ReportBuilder {
    pub fn new(max_error_samples: usize) -> Self {
        Self {
            max_error_samples,
            imported_count: 0,
            error_count: 0,
            error_messages: Vec::new(),
            skipped_count: 0,
            not_started_count: 0,
            started_at: Utc::now(),
        }
    }

    pub fn record_imported(&mut self) {
        self.imported_count += 1;
    }

    pub fn record_skipped(&mut self) {
        self.skipped_count += 1;
    }

    pub fn record_not_started(&mut self, rows: usize) {
        self.not_started_count += rows;
    }

    /// Count a row error and keep its message while the sample has room.
    pub fn record_error(&mut self, name: &str, message: impl std::fmt::Display) {
        self.error_count += 1;
        if self.error_messages.len() < self.max_error_samples {
            self.error_messages.push(format_row_error(name, message));
        }
    }

    pub fn finish(self) -> ImportReport {
        ImportReport {
            imported_count: self.imported_count,
            error_count: self.error_count,
            error_messages: self.error_messages,
            skipped_count: self.skipped_count,
            not_started_count: self.not_started_count,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}

/// `Error importing <name>: <message>`
pub fn format_row_error(name: &str, message: impl std::fmt::Display) -> String {
    format!("Error importing {}: {}", name, message)
}
