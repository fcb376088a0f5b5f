//! Periodic cycle runner.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use super::{CycleSummary, PollService};

/// Default pause between cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20 * 60);

/// Runs poll cycles back to back with a fixed pause in between.
///
/// Cycles never overlap. [`stop`](Self::stop) takes effect after the cycle in
/// progress, or immediately if the scheduler is sleeping.
pub struct Scheduler {
    service: Arc<PollService>,
    interval: Duration,
    /// Flag to stop the loop.
    stop_flag: AtomicBool,
    wake: Notify,
    cycles: AtomicU64,
}

impl Scheduler {
    pub fn new(service: Arc<PollService>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            stop_flag: AtomicBool::new(false),
            wake: Notify::new(),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of cycles run so far.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Asks the loop to stop.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    /// Runs cycles until stopped. Returns the summary of the last cycle run.
    pub async fn run(&self) -> Option<CycleSummary> {
        tracing::info!(interval_secs = self.interval.as_secs(), "Scheduler started");
        let mut last = None;

        loop {
            if self.is_stopped() {
                break;
            }

            let summary = self.service.run_cycle().await;
            let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
            if !summary.is_success() {
                tracing::warn!(cycle, "Cycle did not complete, retrying next interval");
            }
            last = Some(summary);

            if self.is_stopped() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.wake.notified() => {}
            }
        }

        tracing::info!(cycles = self.cycles_completed(), "Scheduler stopped");
        last
    }
}
