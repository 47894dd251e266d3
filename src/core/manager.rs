//! State and behaviour shared by every manager variant.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::core::stats::ManagerStats;
use crate::core::{JobStage, ManagerError, SolvedResult};
use crate::util::clock::{age_of, now_ms};

/// Counters, flags and statistics guarded by a manager's lock.
#[derive(Debug, Clone)]
pub struct ManagerState {
    /// Jobs on the job queue, not yet accepted by the solver.
    pub queued: usize,
    /// Jobs accepted by the solver and awaiting an answer.
    pub registered: usize,
    /// Results handed to callers.
    pub used: u64,
    /// Results produced by the solver.
    pub solved: u64,
    /// Results discarded because they went stale before use.
    pub expired: u64,
    /// No new submissions once set.
    pub stop_requests: bool,
    /// No retrieval once set. Implies `stop_requests`.
    pub finished: bool,
    /// Rolling statistics.
    pub stats: ManagerStats,
}

impl ManagerState {
    /// Fresh state measuring use rate from `now`.
    #[must_use]
    pub const fn new(now: Instant) -> Self {
        Self {
            queued: 0,
            registered: 0,
            used: 0,
            solved: 0,
            expired: 0,
            stop_requests: false,
            finished: false,
            stats: ManagerStats::new(now),
        }
    }

    /// Jobs queued or registered.
    #[must_use]
    pub const fn outstanding(&self) -> usize {
        self.queued + self.registered
    }

    /// Remove one job from the counter for `stage`.
    pub const fn release(&mut self, stage: JobStage) {
        match stage {
            JobStage::Queued => self.queued = self.queued.saturating_sub(1),
            JobStage::Registered => self.registered = self.registered.saturating_sub(1),
        }
    }

    /// `queued -= 1`, `registered += 1`.
    pub const fn mark_registered(&mut self) {
        self.queued = self.queued.saturating_sub(1);
        self.registered += 1;
    }

    /// `registered -= 1`, `queued += 1`.
    pub const fn mark_requeued(&mut self) {
        self.registered = self.registered.saturating_sub(1);
        self.queued += 1;
    }

    /// `registered -= 1`, `solved += 1`, and record the solve time.
    pub fn mark_solved(&mut self, enqueued_at: Instant) {
        self.registered = self.registered.saturating_sub(1);
        self.solved += 1;
        self.stats.solve.record(enqueued_at.elapsed());
    }

    /// Set `stop_requests`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::AlreadyFinished`] if the manager is finished.
    pub const fn request_stop(&mut self) -> Result<(), ManagerError> {
        if self.finished {
            return Err(ManagerError::AlreadyFinished);
        }
        self.stop_requests = true;
        Ok(())
    }

    /// Set both `stop_requests` and `finished`.
    pub const fn force_finish(&mut self) {
        self.stop_requests = true;
        self.finished = true;
    }

    /// Account for a result handed to a caller after waiting since `started`.
    pub fn mark_used(&mut self, started: Instant, now: Instant) {
        self.used += 1;
        self.stats.wait.record(now.saturating_duration_since(started));
        self.stats.use_rate.touch(now);
    }
}

/// Point-in-time view of a manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerStatus {
    /// Results produced by the solver.
    pub solved: u64,
    /// Results handed to callers.
    pub used: u64,
    /// Results discarded as stale.
    pub expired: u64,
    /// Results ready to be retrieved.
    pub available: usize,
    /// Jobs that will produce a result later.
    pub upcoming: usize,
    /// Jobs on the job queue.
    pub queued: usize,
    /// Jobs accepted by the solver.
    pub registered: usize,
    /// Average seconds callers waited for a result.
    pub waiting_time: f64,
    /// Average seconds between retrievals.
    pub use_interval: f64,
    /// Average seconds from enqueue to a ready answer.
    pub solve_time: f64,
    /// Whether new submissions are refused.
    pub stop_requests: bool,
    /// Whether retrieval is permanently over.
    pub finished: bool,
}

/// Operations shared by every manager variant.
pub trait Manager {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    /// Refuse new submissions. Work already in flight still completes.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::AlreadyFinished`] if the manager is finished.
    fn stop(&self) -> Result<(), ManagerError>;

    /// Finish immediately. Buffered and in-flight results become unobservable.
    fn force_stop(&self);

    /// Discard buffered results. Returns how many were discarded.
    fn flush(&self) -> usize;

    /// Snapshot counters and refreshed statistics.
    fn status(&self) -> ManagerStatus;

    /// Results produced by the solver.
    fn solved(&self) -> u64 {
        self.status().solved
    }

    /// Results handed to callers.
    fn used(&self) -> u64 {
        self.status().used
    }

    /// Results discarded as stale.
    fn expired(&self) -> u64 {
        self.status().expired
    }

    /// Average seconds callers waited for a result.
    fn waiting_time(&self) -> f64 {
        self.status().waiting_time
    }

    /// Average seconds between retrievals.
    fn use_interval(&self) -> f64 {
        self.status().use_interval
    }

    /// Emit the current status as one structured `info` event.
    fn log_status(&self) {
        let s = self.status();
        tracing::info!(
            manager = %self.id(),
            solved = s.solved,
            used = s.used,
            expired = s.expired,
            available = s.available,
            upcoming = s.upcoming,
            queued = s.queued,
            registered = s.registered,
            waiting_time = s.waiting_time,
            use_interval = s.use_interval,
            solve_time = s.solve_time,
            stop_requests = s.stop_requests,
            finished = s.finished,
            "manager status"
        );
    }
}

/// Absolute deadline for a wait of at most `max_block`. Durations too large
/// to represent wait without a deadline.
pub(crate) fn deadline_after(start: Instant, max_block: Option<Duration>) -> Option<Instant> {
    max_block.and_then(|d| start.checked_add(d))
}

/// Next wait: one slice, cut short by the deadline. `None` once the deadline passed.
pub(crate) fn next_wait(
    slice: Duration,
    deadline: Option<Instant>,
    now: Instant,
) -> Option<Duration> {
    match deadline {
        None => Some(slice),
        Some(deadline) if deadline <= now => None,
        Some(deadline) => Some(slice.min(deadline - now)),
    }
}

/// Whether `result` was solved longer than `stale_after` ago.
pub(crate) fn is_stale(result: &SolvedResult, stale_after: Duration) -> bool {
    age_of(result.solved_at_ms, now_ms()) > stale_after
}
