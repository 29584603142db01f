//! Data models for the performance auditor.
//!
//! This module contains the core data structures used throughout the
//! application for representing audit samples and persisted records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single timed audit metric: the raw timing plus its weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimedMetric {
    /// Raw metric value in milliseconds.
    pub millis: f64,
    /// Weighted score for this metric, in [0, 1].
    pub score: f64,
}

impl TimedMetric {
    /// Creates a metric from a millisecond timing and its score.
    pub fn new(millis: f64, score: f64) -> Self {
        Self { millis, score }
    }

    /// Returns the timing in seconds.
    pub fn seconds(&self) -> f64 {
        self.millis / 1000.0
    }
}

/// The condensed metric set produced by one audit run.
///
/// An aggregate over several runs has the same shape: each field is the
/// geometric mean of that field across the batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Overall performance score, in [0, 1].
    pub performance_score: f64,
    /// First contentful paint.
    pub first_contentful_paint: TimedMetric,
    /// First meaningful paint.
    pub first_meaningful_paint: TimedMetric,
    /// Speed index.
    pub speed_index: TimedMetric,
    /// Time to interactive.
    pub time_to_interactive: TimedMetric,
    /// First CPU idle.
    pub first_cpu_idle: TimedMetric,
    /// Total byte weight of the page, in bytes.
    pub total_byte_weight: f64,
}

/// Kind of a persisted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// One successful audit run out of a site's batch.
    Partial,
    /// Geometric mean over a site's successful runs.
    Aggregate,
    /// All runs in a site's batch failed; no metrics available.
    Error,
}

impl RecordKind {
    /// Marker used in the persisted record stream.
    pub fn marker(&self) -> &'static str {
        match self {
            RecordKind::Partial => "PARTIAL",
            RecordKind::Aggregate => "GMEAN",
            RecordKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.marker())
    }
}

/// The persisted unit: one site, one record kind, and an optional sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// The audited site URL.
    pub url: String,
    /// What this record represents.
    pub kind: RecordKind,
    /// Metric payload; absent for `Error` records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample: Option<MetricSample>,
}

impl RunRecord {
    /// Record for one successful audit run.
    pub fn partial(url: impl Into<String>, sample: MetricSample) -> Self {
        Self {
            url: url.into(),
            kind: RecordKind::Partial,
            sample: Some(sample),
        }
    }

    /// Record for the geometric mean over a site's batch.
    pub fn aggregate(url: impl Into<String>, sample: MetricSample) -> Self {
        Self {
            url: url.into(),
            kind: RecordKind::Aggregate,
            sample: Some(sample),
        }
    }

    /// Record for a site whose batch produced no successful runs.
    pub fn error(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: RecordKind::Error,
            sample: None,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::sample_with_score;
    use super::*;

    #[test]
    fn test_record_kind_marker() {
        assert_eq!(RecordKind::Partial.marker(), "PARTIAL");
        assert_eq!(RecordKind::Aggregate.marker(), "GMEAN");
        assert_eq!(RecordKind::Error.marker(), "ERROR");
    }

    #[test]
    fn test_timed_metric_seconds() {
        let metric = TimedMetric::new(2500.0, 0.9);
        assert!((metric.seconds() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_constructors() {
        let record = RunRecord::partial("https://a.example", sample_with_score(0.9));
        assert_eq!(record.kind, RecordKind::Partial);
        assert!(record.sample.is_some());

        let record = RunRecord::error("https://b.example");
        assert_eq!(record.kind, RecordKind::Error);
        assert!(record.sample.is_none());
    }
}
