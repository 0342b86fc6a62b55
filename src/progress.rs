//! Import progress reporting.
//!
//! Reports observable progress during `catalog import` so users see how
//! many rows are left and how each one ended. Progress is emitted on
//! **stderr** so stdout stays parseable for scripts.

use clap::ValueEnum;
use std::io::Write;

/// How a single row ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RowStatus {
    Imported,
    Skipped,
    Failed,
}

impl RowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowStatus::Imported => "imported",
            RowStatus::Skipped => "skipped",
            RowStatus::Failed => "failed",
        }
    }
}

/// A single progress event for an import run.
#[derive(Clone, Debug)]
pub enum ImportProgressEvent {
    /// CSV tokenized; `total` rows will be processed.
    Parsed { source: String, total: u64 },
    /// Row `n` of `total` finished.
    Row {
        source: String,
        n: u64,
        total: u64,
        name: String,
        status: RowStatus,
    },
}

/// Reports import progress. Implementations write to stderr (human or JSON).
pub trait ImportProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the import driver.
    fn report(&self, event: ImportProgressEvent);
}

/// Human-friendly progress on stderr: "import products.csv  row 12 / 1,204  imported  Blue Mug".
pub struct StderrProgress;

impl ImportProgressReporter for StderrProgress {
    fn report(&self, event: ImportProgressEvent) {
        let line = match &event {
            ImportProgressEvent::Parsed { source, total } => {
                format!("import {}  {} rows found\n", source, format_number(*total))
            }
            ImportProgressEvent::Row {
                source,
                n,
                total,
                name,
                status,
            } => format!(
                "import {}  row {} / {}  {}  {}\n",
                source,
                format_number(*n),
                format_number(*total),
                status.as_str(),
                name
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ImportProgressReporter for JsonProgress {
    fn report(&self, event: ImportProgressEvent) {
        let obj = match &event {
            ImportProgressEvent::Parsed { source, total } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "parsed",
                "total": total
            }),
            ImportProgressEvent::Row {
                source,
                n,
                total,
                name,
                status,
            } => serde_json::json!({
                "event": "progress",
                "source": source,
                "phase": "row",
                "n": n,
                "total": total,
                "name": name,
                "status": status.as_str()
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ImportProgressReporter for NoProgress {
    fn report(&self, _event: ImportProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// The `--progress` value, or [`default_for_tty`](Self::default_for_tty) when absent.
    pub fn resolve(value: Option<ProgressMode>) -> Self {
        value.unwrap_or_else(Self::default_for_tty)
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn ImportProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn progress_mode_flag_values() {
        assert_eq!(ProgressMode::from_str("off", false).unwrap(), ProgressMode::Off);
        assert_eq!(ProgressMode::from_str("json", false).unwrap(), ProgressMode::Json);
        assert_eq!(
            ProgressMode::from_str("human", false).unwrap(),
            ProgressMode::Human
        );
        assert!(ProgressMode::from_str("loud", false).is_err());
        assert_eq!(ProgressMode::resolve(Some(ProgressMode::Json)), ProgressMode::Json);
    }
}
