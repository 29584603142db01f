//! The run loop: a state machine over the URL list.
//!
//! One URL is in flight at a time, and one URL means a batch of
//! [`RUNS_PER_SITE`] strictly sequential audit attempts; concurrent attempts
//! would contend for the same browser and network and skew the measurements.
//! The window policy is consulted as each URL comes up. Outside the window
//! the scheduler suspends and polls the policy on a fixed interval, then
//! resumes at the exact cursor it paused on.

use crate::analysis::aggregate;
use crate::audit::AuditRunner;
use crate::models::{MetricSample, RunRecord};
use crate::schedule::window::{Clock, TimeWindowPolicy};
use crate::sink::{print_sample_line, ResultSink};
use indicatif::ProgressBar;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Audit attempts per site. This is the aggregation sample size, not a
/// retry budget: a failed attempt shrinks the batch instead of repeating.
pub const RUNS_PER_SITE: usize = 3;

/// Where the scheduler currently stands.
///
/// The cursor rides inside the state and is owned by whichever transition
/// is active; there is no resume point shared between timers and the main
/// flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed, not yet started.
    Idle,
    /// About to process the URL at this cursor.
    Processing(usize),
    /// Outside the run window; will resume at this cursor.
    Suspended(usize),
    /// The URL list is exhausted. Terminal.
    Done,
}

/// Counters reported after a full pass over the URL list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// URLs fully processed.
    pub sites: usize,
    /// Successful audit attempts across all sites.
    pub samples_ok: usize,
    /// Failed audit attempts across all sites.
    pub samples_failed: usize,
    /// Sites where every attempt failed.
    pub sites_failed: usize,
    /// Persistence calls that failed (logged, never fatal).
    pub sink_errors: usize,
}

/// Drives audits over an ordered URL list, gated by the run window.
pub struct Scheduler<R, S, C> {
    urls: Vec<String>,
    runner: R,
    sink: S,
    clock: C,
    /// `None` disables gating entirely (`--ignore-window`).
    window: Option<TimeWindowPolicy>,
    poll_interval: Duration,
    progress: Option<ProgressBar>,
    stats: RunStats,
}

impl<R, S, C> Scheduler<R, S, C>
where
    R: AuditRunner,
    S: ResultSink,
    C: Clock,
{
    /// Creates a scheduler over `urls`.
    pub fn new(
        urls: Vec<String>,
        runner: R,
        sink: S,
        clock: C,
        window: Option<TimeWindowPolicy>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            urls,
            runner,
            sink,
            clock,
            window,
            poll_interval,
            progress: None,
            stats: RunStats::default(),
        }
    }

    /// Attaches a progress bar advanced once per completed URL.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        progress.set_length(self.urls.len() as u64);
        self.progress = Some(progress);
        self
    }

    /// Runs the schedule to completion and returns the counters.
    pub async fn run(mut self) -> RunStats {
        let mut state = SchedulerState::Idle;
        while state != SchedulerState::Done {
            state = self.step(state).await;
        }

        if let Some(ref progress) = self.progress {
            progress.finish_and_clear();
        }

        self.stats
    }

    /// Advances the state machine by one transition.
    pub async fn step(&mut self, state: SchedulerState) -> SchedulerState {
        match state {
            SchedulerState::Idle => SchedulerState::Processing(0),

            SchedulerState::Processing(cursor) if cursor >= self.urls.len() => {
                info!("Schedule complete: {} sites processed", self.stats.sites);
                SchedulerState::Done
            }

            SchedulerState::Processing(cursor) => {
                // Re-evaluated on every decision; wall-clock time has moved
                // since the last check.
                if !self.window_permits() {
                    info!(
                        "Outside run window, suspending before site {} of {}",
                        cursor + 1,
                        self.urls.len()
                    );
                    return SchedulerState::Suspended(cursor);
                }

                self.process_site(cursor).await;
                if let Some(ref progress) = self.progress {
                    progress.inc(1);
                }
                SchedulerState::Processing(cursor + 1)
            }

            SchedulerState::Suspended(cursor) => {
                self.wait_for_window().await;
                info!("Run window open again, resuming at site {}", cursor + 1);
                SchedulerState::Processing(cursor)
            }

            SchedulerState::Done => SchedulerState::Done,
        }
    }

    fn window_permits(&self) -> bool {
        match self.window {
            Some(ref window) => window.is_run_window(self.clock.now()),
            None => true,
        }
    }

    /// Sleeps in poll-interval steps until the window opens.
    ///
    /// Returning drops the pending sleep, so a resumed schedule can never
    /// see a stale poll fire: cancellation happens exactly once, by drop.
    async fn wait_for_window(&self) {
        loop {
            tokio::time::sleep(self.poll_interval).await;
            if self.window_permits() {
                return;
            }
            debug!("Still outside run window");
        }
    }

    /// Runs the full batch for one URL and persists its records.
    async fn process_site(&mut self, cursor: usize) {
        let url = self.urls[cursor].clone();
        info!(
            "Auditing {} ({} of {})",
            url,
            cursor + 1,
            self.urls.len()
        );

        let mut batch: Vec<MetricSample> = Vec::with_capacity(RUNS_PER_SITE);

        for attempt in 1..=RUNS_PER_SITE {
            match self.runner.run_once(&url).await {
                Ok(sample) => {
                    self.stats.samples_ok += 1;
                    print_sample_line(&format!("run {}/{}", attempt, RUNS_PER_SITE), &url, &sample);
                    self.persist(RunRecord::partial(&url, sample));
                    batch.push(sample);
                }
                Err(e) => {
                    self.stats.samples_failed += 1;
                    warn!("Attempt {}/{} failed for {}: {}", attempt, RUNS_PER_SITE, url, e);
                }
            }
        }

        match aggregate(&batch) {
            Some(summary) => {
                print_sample_line("gmean", &url, &summary);
                self.persist(RunRecord::aggregate(&url, summary));
            }
            None => {
                error!("All {} attempts failed for {}", RUNS_PER_SITE, url);
                self.stats.sites_failed += 1;
                self.persist(RunRecord::error(&url));
            }
        }

        self.stats.sites += 1;
    }

    fn persist(&mut self, record: RunRecord) {
        if let Err(e) = self.sink.record(&record) {
            self.stats.sink_errors += 1;
            error!("Failed to persist {} record for {}: {}", record.kind, record.url, e);
        }
    }
}
