//! Local Lighthouse CLI adapter.
//!
//! Spawns the `lighthouse` binary once per attempt. Every invocation gets
//! its own temporary working directory and headless browser; the process is
//! killed if it outlives the bounding timeout.

use crate::audit::{parse_report, save_raw_report, AuditError, AuditRunner};
use crate::models::MetricSample;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs audits by invoking the Lighthouse CLI.
pub struct LighthouseRunner {
    binary: PathBuf,
    chrome_flags: String,
    timeout: Duration,
    assets_dir: Option<PathBuf>,
}

impl LighthouseRunner {
    /// Creates a runner for the given binary and per-attempt timeout.
    ///
    /// When `assets_dir` is set, each successful run's raw report is saved
    /// there, keyed by the report's final URL and fetch time.
    pub fn new(
        binary: PathBuf,
        chrome_flags: String,
        timeout_seconds: u64,
        assets_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            binary,
            chrome_flags,
            timeout: Duration::from_secs(timeout_seconds),
            assets_dir,
        }
    }
}

#[async_trait]
impl AuditRunner for LighthouseRunner {
    async fn run_once(&self, url: &str) -> Result<MetricSample, AuditError> {
        let workdir = tempfile::tempdir()?;
        let report_path = workdir.path().join("report.json");

        let mut command = Command::new(&self.binary);
        command
            .arg(url)
            .arg("--output=json")
            .arg(format!("--output-path={}", report_path.display()))
            .arg("--quiet")
            .arg(format!("--chrome-flags={}", self.chrome_flags))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Launching {} for {}", self.binary.display(), url);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| AuditError::Timeout(self.timeout.as_secs()))?
            .map_err(AuditError::Launch)?;

        if !output.status.success() {
            return Err(AuditError::Engine {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let raw = std::fs::read_to_string(&report_path)?;
        let report: Value =
            serde_json::from_str(&raw).map_err(|_| AuditError::MalformedReport("report body"))?;
        let sample = parse_report(&report)?;

        if let Some(ref dir) = self.assets_dir {
            if let Err(e) = save_raw_report(dir, &report, &raw) {
                warn!("Failed to save raw report for {}: {}", url, e);
            }
        }

        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::test_support::lighthouse_report;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    /// Installs a stand-in engine script and returns its path.
    fn fake_engine(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-lighthouse");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Engine that writes a canned report to the requested output path.
    fn reporting_engine(dir: &Path, score: f64) -> PathBuf {
        let fixture = dir.join("canned-report.json");
        std::fs::write(&fixture, lighthouse_report(score).to_string()).unwrap();

        let body = format!(
            r#"for arg in "$@"; do
  case "$arg" in
    --output-path=*) cp {} "${{arg#--output-path=}}" ;;
  esac
done"#,
            fixture.display()
        );
        fake_engine(dir, &body)
    }

    #[tokio::test]
    async fn test_successful_run_parses_report() {
        let dir = TempDir::new().unwrap();
        let runner = LighthouseRunner::new(
            reporting_engine(dir.path(), 0.9),
            "--headless".to_string(),
            5,
            None,
        );

        let sample = runner.run_once("https://a.example").await.unwrap();
        assert!((sample.performance_score - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_save_assets_writes_raw_report() {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("assets");
        let runner = LighthouseRunner::new(
            reporting_engine(dir.path(), 0.9),
            "--headless".to_string(),
            5,
            Some(assets.clone()),
        );

        runner.run_once("https://a.example").await.unwrap();

        let saved: Vec<_> = std::fs::read_dir(&assets).unwrap().collect();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let runner = LighthouseRunner::new(
            PathBuf::from("/nonexistent/lighthouse"),
            "--headless".to_string(),
            5,
            None,
        );

        let err = runner.run_once("https://a.example").await.unwrap_err();
        assert!(matches!(err, AuditError::Launch(_)));
    }

    #[tokio::test]
    async fn test_failed_engine_reports_stderr() {
        let dir = TempDir::new().unwrap();
        let runner = LighthouseRunner::new(
            fake_engine(dir.path(), "echo 'chrome crashed' >&2; exit 3"),
            "--headless".to_string(),
            5,
            None,
        );

        let err = runner.run_once("https://a.example").await.unwrap_err();
        match err {
            AuditError::Engine { status, stderr } => {
                assert_eq!(status, 3);
                assert_eq!(stderr, "chrome crashed");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_hung_engine_times_out() {
        let dir = TempDir::new().unwrap();
        let runner = LighthouseRunner::new(
            fake_engine(dir.path(), "sleep 30"),
            "--headless".to_string(),
            1,
            None,
        );

        let err = runner.run_once("https://a.example").await.unwrap_err();
        assert!(matches!(err, AuditError::Timeout(1)));
    }
}
