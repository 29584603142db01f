//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sitegauge.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which audit engine produces the samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuditEngine {
    /// Local Lighthouse CLI (spawns a headless browser per run).
    Lighthouse,
    /// PageSpeed Insights HTTP API.
    Pagespeed,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Audit engine settings.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Run window and polling settings.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Target sites.
    #[serde(default)]
    pub sites: SitesConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default CSV output path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "sitegauge_records.csv".to_string()
}

/// Audit engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Engine used for audits.
    #[serde(default = "default_engine")]
    pub engine: AuditEngine,

    /// Lighthouse CLI binary.
    #[serde(default = "default_lighthouse_bin")]
    pub lighthouse_bin: String,

    /// Flags passed through to the headless browser.
    #[serde(default = "default_chrome_flags")]
    pub chrome_flags: String,

    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Save each run's raw audit report.
    #[serde(default)]
    pub save_assets: bool,

    /// Directory for raw audit reports.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,

    /// PageSpeed Insights endpoint.
    #[serde(default = "default_pagespeed_endpoint")]
    pub pagespeed_endpoint: String,

    /// API key for the PageSpeed endpoint, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagespeed_api_key: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            lighthouse_bin: default_lighthouse_bin(),
            chrome_flags: default_chrome_flags(),
            timeout_seconds: default_timeout(),
            save_assets: false,
            assets_dir: default_assets_dir(),
            pagespeed_endpoint: default_pagespeed_endpoint(),
            pagespeed_api_key: None,
        }
    }
}

fn default_engine() -> AuditEngine {
    AuditEngine::Lighthouse
}

fn default_lighthouse_bin() -> String {
    "lighthouse".to_string()
}

fn default_chrome_flags() -> String {
    "--headless".to_string()
}

fn default_timeout() -> u64 {
    120 // One audit run incl. browser startup rarely needs more
}

fn default_assets_dir() -> String {
    "sitegauge_assets".to_string()
}

fn default_pagespeed_endpoint() -> String {
    "https://www.googleapis.com/pagespeedonline/v5/runPagespeed".to_string()
}

/// Run window and polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// First hour of the run window (inclusive).
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,

    /// Last hour of the run window (inclusive).
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,

    /// UTC offset of the designated region, in whole hours.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,

    /// How often to re-check the window while suspended, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            utc_offset_hours: default_utc_offset(),
            poll_interval_seconds: default_poll_interval(),
        }
    }
}

fn default_start_hour() -> u32 {
    9
}

fn default_end_hour() -> u32 {
    18
}

fn default_utc_offset() -> i32 {
    2
}

fn default_poll_interval() -> u64 {
    60
}

/// Target sites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitesConfig {
    /// Ordered list of URLs to audit.
    #[serde(default)]
    pub urls: Vec<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".sitegauge.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref urls) = args.urls {
            self.sites.urls = urls.clone();
        }

        if let Some(engine) = args.engine {
            self.audit.engine = engine;
        }

        if let Some(timeout) = args.timeout {
            self.audit.timeout_seconds = timeout;
        }

        if args.save_assets {
            self.audit.save_assets = true;
        }
        if let Some(ref dir) = args.assets_dir {
            self.audit.assets_dir = dir.display().to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
