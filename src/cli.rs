//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::AuditEngine;
use clap::Parser;
use std::path::PathBuf;

/// SiteGauge - scheduled Lighthouse batch auditor
///
/// Audits a list of URLs during working hours, runs each audit three
/// times, and records the geometric mean of every metric to CSV.
///
/// Examples:
///   sitegauge --urls https://a.example,https://b.example
///   sitegauge --config .sitegauge.toml --save-assets
///   sitegauge --urls https://a.example --ignore-window --engine pagespeed
///   sitegauge --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Target URLs to audit (comma-separated)
    ///
    /// Overrides the [sites] section of the configuration file.
    #[arg(short, long, value_name = "URLS", value_delimiter = ',')]
    pub urls: Option<Vec<String>>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sitegauge.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output CSV file for the record stream
    #[arg(
        short,
        long,
        default_value = "sitegauge_records.csv",
        value_name = "FILE"
    )]
    pub output: PathBuf,

    /// Audit engine to use
    ///
    /// `lighthouse` spawns the local Lighthouse CLI; `pagespeed` calls the
    /// PageSpeed Insights API. Overrides the config file setting.
    #[arg(long, value_name = "ENGINE")]
    pub engine: Option<AuditEngine>,

    /// Per-attempt timeout in seconds
    ///
    /// How long one audit run may take before it is abandoned.
    /// Default: from config or 120s.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Save each run's raw audit report
    ///
    /// Reports are written as JSON, keyed by final URL and fetch time.
    #[arg(long)]
    pub save_assets: bool,

    /// Directory for raw audit reports (implies nothing without --save-assets)
    #[arg(long, value_name = "DIR")]
    pub assets_dir: Option<PathBuf>,

    /// Run immediately, ignoring the configured schedule window
    #[arg(long)]
    pub ignore_window: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list the target URLs and window verdict without auditing
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .sitegauge.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate URL formats
        if let Some(ref urls) = self.urls {
            for url in urls {
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(format!(
                        "Target URL must start with 'https://' or 'http://': {}",
                        url
                    ));
                }
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.assets_dir.is_some() && !self.save_assets {
            return Err("--assets-dir requires --save-assets".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
