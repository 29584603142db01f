//! Result persistence and console output.
//!
//! The scheduler hands every record to a [`ResultSink`]; the production
//! sink appends to a CSV file. Formatting helpers here are shared between
//! the CSV rows and the per-run console lines.

pub mod csv_sink;

pub use csv_sink::CsvSink;

use crate::models::{MetricSample, RunRecord};
use thiserror::Error;

/// A persistence call failed. Reported to the operator but never aborts
/// scheduling: progress takes precedence over persistence completeness.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write record: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// External collaborator boundary: persists one record, append-only.
pub trait ResultSink {
    /// Appends one record to the stream.
    fn record(&mut self, record: &RunRecord) -> Result<(), SinkError>;
}

/// Formats a millisecond timing as fixed-point seconds.
pub fn format_seconds(millis: f64) -> String {
    format!("{:.2}", millis / 1000.0)
}

/// Formats a byte count for human consumption.
pub fn format_bytes(bytes: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{} B", bytes as u64)
    }
}

/// Prints the console summary line for one run or aggregate.
pub fn print_sample_line(label: &str, url: &str, sample: &MetricSample) {
    println!(
        "   {:<7} {}  perf {:.2} | fcp {}s ({:.2}) | si {}s ({:.2}) | tti {}s ({:.2}) | {}",
        label,
        url,
        sample.performance_score,
        format_seconds(sample.first_contentful_paint.millis),
        sample.first_contentful_paint.score,
        format_seconds(sample.speed_index.millis),
        sample.speed_index.score,
        format_seconds(sample.time_to_interactive.millis),
        sample.time_to_interactive.score,
        format_bytes(sample.total_byte_weight),
    );
}
