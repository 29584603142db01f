//! PageSpeed Insights API adapter.
//!
//! Runs Lighthouse remotely via Google's hosted endpoint instead of a local
//! browser. Useful on hosts without Chrome; the returned payload embeds the
//! same report JSON under `lighthouseResult`.

use crate::audit::{parse_report, save_raw_report, AuditError, AuditRunner};
use crate::models::MetricSample;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Runs audits through the PageSpeed Insights HTTP API.
pub struct PagespeedRunner {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    timeout_seconds: u64,
    assets_dir: Option<PathBuf>,
}

impl PagespeedRunner {
    /// Creates a runner against `endpoint` with the given per-attempt timeout.
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        timeout_seconds: u64,
        assets_dir: Option<PathBuf>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint,
            api_key,
            timeout_seconds,
            assets_dir,
        }
    }
}

#[async_trait]
impl AuditRunner for PagespeedRunner {
    async fn run_once(&self, url: &str) -> Result<MetricSample, AuditError> {
        let mut query: Vec<(&str, String)> = vec![
            ("url", url.to_string()),
            ("category", "performance".to_string()),
        ];
        if let Some(ref key) = self.api_key {
            query.push(("key", key.clone()));
        }

        debug!("Requesting remote audit of {} via {}", url, self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuditError::Timeout(self.timeout_seconds)
                } else if e.is_connect() {
                    AuditError::Unreachable(self.endpoint.clone())
                } else {
                    AuditError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuditError::Endpoint { status, body });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|_| AuditError::MalformedReport("response body"))?;

        let report = &payload["lighthouseResult"];
        if report.is_null() {
            return Err(AuditError::MalformedReport("lighthouseResult"));
        }

        let sample = parse_report(report)?;

        if let Some(ref dir) = self.assets_dir {
            if let Err(e) = save_raw_report(dir, report, &report.to_string()) {
                warn!("Failed to save raw report for {}: {}", url, e);
            }
        }

        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        // Nothing listens on this port.
        let runner = PagespeedRunner::new("http://127.0.0.1:9".to_string(), None, 2, None);

        let err = runner.run_once("https://a.example").await.unwrap_err();
        assert!(matches!(
            err,
            AuditError::Unreachable(_) | AuditError::Transport(_)
        ));
    }
}
