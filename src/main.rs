//! SiteGauge - scheduled Lighthouse batch auditor
//!
//! A CLI tool that audits a list of URLs during working hours, runs each
//! audit three times, and records the geometric mean of every metric to an
//! append-only CSV stream.
//!
//! Exit codes:
//!   0 - Success (every site produced at least one sample)
//!   1 - Runtime error (config, window, output file, etc.)
//!   2 - At least one site produced no successful samples

mod analysis;
mod audit;
mod cli;
mod config;
mod models;
mod schedule;
mod sink;

use anyhow::{Context, Result};
use audit::{AuditRunner, LighthouseRunner, PagespeedRunner};
use cli::Args;
use config::{AuditEngine, Config};
use indicatif::{ProgressBar, ProgressStyle};
use schedule::{Clock, RunStats, Scheduler, SystemClock, TimeWindowPolicy, RUNS_PER_SITE};
use sink::CsvSink;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("SiteGauge v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the schedule
    match run_schedule(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Audit schedule failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .sitegauge.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".sitegauge.toml");

    if path.exists() {
        eprintln!("⚠️  .sitegauge.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .sitegauge.toml")?;

    println!("✅ Created .sitegauge.toml with default settings.");
    println!("   Edit it to add target URLs and customize engine and schedule.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete audit schedule. Returns exit code (0 or 2).
async fn run_schedule(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let urls = config.sites.urls.clone();
    if urls.is_empty() {
        anyhow::bail!("No target URLs. Pass --urls or add a [sites] section to .sitegauge.toml");
    }

    // A broken window or zone configuration is fatal before any audit runs.
    let policy = TimeWindowPolicy::new(config.schedule.start_hour, config.schedule.end_hour)
        .context("Invalid run window configuration")?;
    let clock = SystemClock::with_utc_offset_hours(config.schedule.utc_offset_hours)
        .context("Invalid schedule zone configuration")?;

    // Handle --dry-run: list targets and window verdict, then exit
    if args.dry_run {
        return handle_dry_run(&urls, &policy, &clock);
    }

    let window = if args.ignore_window {
        info!("Run window disabled by --ignore-window");
        None
    } else {
        Some(policy)
    };

    let engine_str = match config.audit.engine {
        AuditEngine::Lighthouse => "Lighthouse CLI",
        AuditEngine::Pagespeed => "PageSpeed Insights API",
    };

    println!("🔬 Auditing {} sites ({} runs each)", urls.len(), RUNS_PER_SITE);
    println!("   Engine: {}", engine_str);
    println!(
        "   Window: {:02}:00-{:02}:59 UTC{:+}, weekdays{}",
        config.schedule.start_hour,
        config.schedule.end_hour,
        config.schedule.utc_offset_hours,
        if args.ignore_window { " (ignored)" } else { "" }
    );
    println!("   Records: {}\n", args.output.display());

    let sink = CsvSink::create(&args.output)
        .with_context(|| format!("Failed to open record stream at {}", args.output.display()))?;

    let assets_dir = if config.audit.save_assets {
        Some(PathBuf::from(&config.audit.assets_dir))
    } else {
        None
    };

    let poll_interval = Duration::from_secs(config.schedule.poll_interval_seconds);

    let stats = match config.audit.engine {
        AuditEngine::Lighthouse => {
            let runner = LighthouseRunner::new(
                PathBuf::from(&config.audit.lighthouse_bin),
                config.audit.chrome_flags.clone(),
                config.audit.timeout_seconds,
                assets_dir,
            );
            drive(&args, urls, runner, sink, clock, window, poll_interval).await
        }
        AuditEngine::Pagespeed => {
            let runner = PagespeedRunner::new(
                config.audit.pagespeed_endpoint.clone(),
                config.audit.pagespeed_api_key.clone(),
                config.audit.timeout_seconds,
                assets_dir,
            );
            drive(&args, urls, runner, sink, clock, window, poll_interval).await
        }
    };

    // Print summary
    let duration = start_time.elapsed().as_secs_f64();
    println!("\n📊 Schedule Summary:");
    println!("   Sites audited: {}", stats.sites);
    println!(
        "   Runs: {} ok, {} failed",
        stats.samples_ok, stats.samples_failed
    );
    if stats.sink_errors > 0 {
        warn!("{} records could not be persisted", stats.sink_errors);
    }
    println!("   Duration: {:.1}s", duration);
    println!(
        "\n✅ Schedule complete! Records appended to: {}",
        args.output.display()
    );

    if stats.sites_failed > 0 {
        eprintln!(
            "\n⛔ {} site(s) produced no successful runs (exit code 2).",
            stats.sites_failed
        );
        return Ok(2);
    }

    Ok(0)
}

/// Builds the scheduler for a concrete runner and runs it to completion.
async fn drive<R: AuditRunner>(
    args: &Args,
    urls: Vec<String>,
    runner: R,
    sink: CsvSink,
    clock: SystemClock,
    window: Option<TimeWindowPolicy>,
    poll_interval: Duration,
) -> RunStats {
    let mut scheduler = Scheduler::new(urls, runner, sink, clock, window, poll_interval);

    if !args.quiet {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        scheduler = scheduler.with_progress(pb);
    }

    scheduler.run().await
}

/// Handle --dry-run: list targets and the current window verdict, exit.
fn handle_dry_run(urls: &[String], policy: &TimeWindowPolicy, clock: &SystemClock) -> Result<i32> {
    println!("\n🔍 Dry run: no audits will be launched.\n");

    println!("   {} target site(s):", urls.len());
    for url in urls {
        println!("     🌐 {}", url);
    }

    let now = clock.now();
    let open = policy.is_run_window(now);
    println!(
        "\n   Run window is currently {} (local time {})",
        if open { "OPEN" } else { "CLOSED" },
        now.format("%Y-%m-%d %H:%M %:z")
    );

    println!("\n✅ Dry run complete. No audits were launched.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .sitegauge.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
