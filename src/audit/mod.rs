//! Audit engine adapters.
//!
//! The scheduler treats the audit engine as a black box: one invocation per
//! run, yielding a [`MetricSample`] or an [`AuditError`]. Two adapters are
//! provided: a local Lighthouse CLI subprocess and the PageSpeed Insights
//! HTTP API. Both produce the same Lighthouse report JSON, parsed here.

pub mod lighthouse;
pub mod pagespeed;

pub use lighthouse::LighthouseRunner;
pub use pagespeed::PagespeedRunner;

use crate::models::{MetricSample, TimedMetric};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// One audit attempt failed. Non-fatal to the batch: the scheduler logs it
/// and continues with a smaller aggregation batch.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The engine process could not be launched.
    #[error("failed to launch audit engine: {0}")]
    Launch(#[source] std::io::Error),

    /// The engine ran but exited unsuccessfully.
    #[error("audit engine exited with status {status}: {stderr}")]
    Engine { status: i32, stderr: String },

    /// The attempt exceeded its bounding timeout.
    #[error("audit attempt timed out after {0}s")]
    Timeout(u64),

    /// The remote audit endpoint could not be reached.
    #[error("cannot reach audit endpoint {0}")]
    Unreachable(String),

    /// The remote audit endpoint rejected the request.
    #[error("audit endpoint returned HTTP {status}: {body}")]
    Endpoint { status: u16, body: String },

    /// Request failed in transit.
    #[error("transport error: {0}")]
    Transport(String),

    /// The engine produced a report this parser does not understand.
    #[error("malformed audit report: missing {0}")]
    MalformedReport(&'static str),

    /// Reading the engine's report from disk failed.
    #[error("failed to read audit report: {0}")]
    Io(#[from] std::io::Error),
}

/// External collaborator boundary: produces one raw audit result per call.
///
/// Each invocation is independent and may spawn and tear down an isolated
/// engine environment. Implementations impose their own bounding timeout so
/// a hung engine cannot stall the scheduler.
#[async_trait]
pub trait AuditRunner {
    /// Runs one audit against `url`.
    async fn run_once(&self, url: &str) -> Result<MetricSample, AuditError>;
}

/// Extracts the condensed metric set from a Lighthouse report.
pub(crate) fn parse_report(report: &Value) -> Result<MetricSample, AuditError> {
    let performance_score = report["categories"]["performance"]["score"]
        .as_f64()
        .ok_or(AuditError::MalformedReport("categories.performance.score"))?;

    Ok(MetricSample {
        performance_score,
        first_contentful_paint: timed_audit(report, "first-contentful-paint")?,
        first_meaningful_paint: timed_audit(report, "first-meaningful-paint")?,
        speed_index: timed_audit(report, "speed-index")?,
        time_to_interactive: timed_audit(report, "interactive")?,
        first_cpu_idle: timed_audit(report, "first-cpu-idle")?,
        total_byte_weight: report["audits"]["total-byte-weight"]["numericValue"]
            .as_f64()
            .ok_or(AuditError::MalformedReport("audits.total-byte-weight"))?,
    })
}

fn timed_audit(report: &Value, id: &'static str) -> Result<TimedMetric, AuditError> {
    let audit = &report["audits"][id];
    let millis = audit["numericValue"]
        .as_f64()
        .ok_or(AuditError::MalformedReport(id))?;
    // A metric can be informational-only; Lighthouse then reports score: null.
    let score = audit["score"].as_f64().unwrap_or(0.0);

    Ok(TimedMetric::new(millis, score))
}

/// Stable artifact identifier taken from the report itself.
pub(crate) fn artifact_key(report: &Value) -> String {
    let url = report["finalUrl"]
        .as_str()
        .or_else(|| report["requestedUrl"].as_str())
        .unwrap_or("unknown");
    let fetched = report["fetchTime"].as_str().unwrap_or("unknown");

    sanitize_key(&format!("{}-{}", url, fetched))
}

fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Persists the raw report JSON under `dir`, keyed by [`artifact_key`].
pub(crate) fn save_raw_report(dir: &Path, report: &Value, raw: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(format!("{}.json", artifact_key(report)));
    std::fs::write(&path, raw)?;
    debug!("Saved raw audit report to {}", path.display());

    Ok(path)
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::{json, Value};

    /// A minimal Lighthouse report with the audits this tool consumes.
    pub(crate) fn lighthouse_report(score: f64) -> Value {
        json!({
            "requestedUrl": "https://a.example/",
            "finalUrl": "https://a.example/",
            "fetchTime": "2026-08-03T10:15:00.000Z",
            "categories": { "performance": { "score": score } },
            "audits": {
                "first-contentful-paint": { "numericValue": 1200.0, "score": 0.95 },
                "first-meaningful-paint": { "numericValue": 1500.0, "score": 0.92 },
                "speed-index": { "numericValue": 2300.0, "score": 0.88 },
                "interactive": { "numericValue": 3100.0, "score": 0.81 },
                "first-cpu-idle": { "numericValue": 2900.0, "score": 0.85 },
                "total-byte-weight": { "numericValue": 1_400_000.0, "score": 1.0 }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::lighthouse_report;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_report() {
        let sample = parse_report(&lighthouse_report(0.9)).unwrap();

        assert!((sample.performance_score - 0.9).abs() < 1e-9);
        assert!((sample.first_contentful_paint.millis - 1200.0).abs() < 1e-9);
        assert!((sample.time_to_interactive.score - 0.81).abs() < 1e-9);
        assert!((sample.total_byte_weight - 1_400_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_report_missing_audit() {
        let mut report = lighthouse_report(0.9);
        report["audits"]
            .as_object_mut()
            .unwrap()
            .remove("speed-index");

        let err = parse_report(&report).unwrap_err();
        assert!(matches!(err, AuditError::MalformedReport("speed-index")));
    }

    #[test]
    fn test_parse_report_null_score_defaults_to_zero() {
        let mut report = lighthouse_report(0.9);
        report["audits"]["interactive"]["score"] = json!(null);

        let sample = parse_report(&report).unwrap();
        assert_eq!(sample.time_to_interactive.score, 0.0);
    }

    #[test]
    fn test_artifact_key_is_sanitized() {
        let key = artifact_key(&lighthouse_report(0.9));

        assert_eq!(key, "https___a.example_-2026-08-03T10_15_00.000Z");
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()
            || c == '-'
            || c == '.'
            || c == '_'));
    }

    #[test]
    fn test_save_raw_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = lighthouse_report(0.9);

        let path = save_raw_report(dir.path(), &report, &report.to_string()).unwrap();

        assert!(path.exists());
        let raw = std::fs::read_to_string(path).unwrap();
        assert!(raw.contains("first-contentful-paint"));
    }
}
