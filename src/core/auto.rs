//! Self-pacing manager for a single stream of identical jobs.
//!
//! An [`AutoManager`] decides on its own how many jobs to put on the job
//! queue. Until a few results have been used it sends a fixed cold-start
//! batch; afterwards [`paced_demand`] sizes each send from the observed solve
//! latency and consumption rate.
//!
//! Handles are cheap to clone and may be used from any thread. Every counter
//! mutation happens under one lock; blocking waits happen outside it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::ManagerConfig;
use crate::core::manager::{deadline_after, is_stale, next_wait};
use crate::core::pacing::{paced_demand, PacingInput, MIN_HISTORY};
use crate::core::stats::UseRate;
use crate::core::{
    ConfigurationError, Job, JobOwner, JobStage, Manager, ManagerError, ManagerState, ManagerStatus,
    PendingRequest, SolvedResult, TargetDescriptor,
};
use crate::infra::mailbox::{Delivery, Received};
use crate::infra::{JobQueue, ResultChannel};

struct AutoState {
    base: ManagerState,
    restore_point: Option<UseRate>,
}

struct AutoShared {
    id: String,
    target: Arc<TargetDescriptor>,
    config: ManagerConfig,
    queue: JobQueue,
    results: ResultChannel,
    state: Mutex<AutoState>,
}

/// Handle to a self-pacing manager.
#[derive(Clone)]
pub struct AutoManager {
    shared: Arc<AutoShared>,
}

impl AutoManager {
    /// Create a manager feeding `queue` with jobs for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidDescriptor`] if `target` does not
    /// validate and [`ManagerError::InvalidArgument`] if `config` does not.
    pub fn create(
        queue: &JobQueue,
        target: TargetDescriptor,
        config: ManagerConfig,
    ) -> Result<Self, ManagerError> {
        Self::create_named(queue, Uuid::new_v4().to_string(), target, config)
    }

    /// Same as [`AutoManager::create`] with an explicit identifier for logs.
    ///
    /// # Errors
    ///
    /// See [`AutoManager::create`].
    pub fn create_named(
        queue: &JobQueue,
        id: impl Into<String>,
        target: TargetDescriptor,
        config: ManagerConfig,
    ) -> Result<Self, ManagerError> {
        target.validate()?;
        config.validate().map_err(ManagerError::InvalidArgument)?;

        let id = id.into();
        tracing::info!(manager = %id, target = %target, "auto manager created");
        Ok(Self {
            shared: Arc::new(AutoShared {
                id,
                target: Arc::new(target),
                config,
                queue: queue.clone(),
                results: ResultChannel::new(),
                state: Mutex::new(AutoState {
                    base: ManagerState::new(Instant::now()),
                    restore_point: None,
                }),
            }),
        })
    }

    /// Target every job of this manager solves.
    #[must_use]
    pub fn target(&self) -> &TargetDescriptor {
        &self.shared.target
    }

    /// Put as many jobs on the queue as the pacing model asks for.
    ///
    /// `maximum` and `initial` override the configured values for this call.
    /// Returns how many jobs were enqueued; 0 once stopped or at the limit.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Queue`] if the job queue was closed; the
    /// jobs that could not be enqueued are not counted.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn send_request(
        &self,
        maximum: Option<u32>,
        initial: Option<u32>,
    ) -> Result<usize, ManagerError> {
        let shared = &self.shared;
        let maximum = maximum.unwrap_or(shared.config.maximum);
        let initial = initial.unwrap_or(shared.config.initial);
        let limit = shared.config.limit as usize;

        let count = {
            let mut state = shared.state.lock();
            let base = &mut state.base;
            if base.stop_requests {
                return Ok(0);
            }
            let outstanding = base.outstanding();
            if limit > 0 && outstanding >= limit {
                return Ok(0);
            }

            base.stats.refresh();
            let interval = base.stats.use_rate.rate();
            let cold = base.used < MIN_HISTORY || !(interval > 0.0 && interval.is_finite());
            let mut to_send = if cold {
                f64::from(initial)
            } else {
                paced_demand(&PacingInput {
                    latency_secs: base.stats.solve.rate,
                    use_interval_secs: interval,
                    buffered: shared.results.len(),
                    inflight: outstanding,
                    maximum,
                })
            };
            if limit > 0 {
                to_send = to_send.min((limit - outstanding) as f64);
            }

            let count = to_send.max(0.0).round() as usize;
            base.queued += count;
            count
        };

        if count > 0 {
            tracing::debug!(manager = %shared.id, count, "sending jobs");
            shared.enqueue(count)?;
        }
        Ok(count)
    }

    /// Retrieve one fresh result, blocking up to `max_block` (forever if `None`).
    ///
    /// With `allow_refill`, a wait slice that ends with nothing outstanding
    /// enqueues exactly one job so the caller cannot starve.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::Exhausted`] once the manager is finished, or stopped
    ///   with no work left.
    /// - [`ManagerError::TimedOut`] when `max_block` elapses first.
    /// - [`ManagerError::Rejected`] when the solver rejected a job of this manager.
    /// - [`ManagerError::Queue`] when a refill job could not be enqueued.
    pub fn get_request(
        &self,
        allow_refill: bool,
        max_block: Option<Duration>,
    ) -> Result<SolvedResult, ManagerError> {
        let shared = &self.shared;
        let start = Instant::now();
        {
            let mut state = shared.state.lock();
            let base = &mut state.base;
            if base.stop_requests && base.outstanding() + shared.results.len() == 0 {
                base.finished = true;
            }
            if base.finished {
                return Err(ManagerError::Exhausted);
            }
            base.stats.use_rate.record_call(start);
        }

        let deadline = deadline_after(start, max_block);
        loop {
            let wait = next_wait(shared.config.wait_slice(), deadline, Instant::now())
                .unwrap_or_default();
            match shared.results.receive(wait) {
                Received::Delivery(Delivery::Solved(result)) => {
                    let mut state = shared.state.lock();
                    let base = &mut state.base;
                    if base.finished {
                        return Err(ManagerError::Exhausted);
                    }
                    if is_stale(&result, shared.config.stale_after()) {
                        base.expired += 1;
                        tracing::warn!(
                            manager = %shared.id,
                            task = %result.task_id,
                            "discarding expired result"
                        );
                        continue;
                    }
                    base.mark_used(start, Instant::now());
                    return Ok(result);
                }
                Received::Delivery(Delivery::Failed(error)) => {
                    shared.state.lock().base.stats.use_rate.touch(Instant::now());
                    return Err(ManagerError::Rejected(error));
                }
                Received::Timeout => {
                    let refill = {
                        let mut state = shared.state.lock();
                        let base = &mut state.base;
                        let idle = base.outstanding() == 0 && shared.results.is_empty();
                        if base.stop_requests && idle {
                            base.finished = true;
                        }
                        if base.finished {
                            return Err(ManagerError::Exhausted);
                        }
                        if deadline.is_some_and(|d| Instant::now() >= d) {
                            base.stats.use_rate.touch(Instant::now());
                            return Err(ManagerError::TimedOut(max_block.unwrap_or_default()));
                        }
                        let refill = allow_refill && idle && !base.stop_requests;
                        if refill {
                            base.queued += 1;
                        }
                        refill
                    };
                    if refill {
                        tracing::debug!(manager = %shared.id, "nothing outstanding, refilling");
                        shared.enqueue(1)?;
                    }
                }
            }
        }
    }

    /// Average seconds from enqueue to a ready answer.
    #[must_use]
    pub fn solve_time(&self) -> f64 {
        self.status().solve_time
    }

    /// Results ready to be retrieved.
    #[must_use]
    pub fn available(&self) -> usize {
        self.shared.results.len()
    }

    /// Jobs queued or registered that will produce a result later.
    #[must_use]
    pub fn upcoming(&self) -> usize {
        self.shared.state.lock().base.outstanding()
    }

    /// Snapshot the use-rate statistic.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Restore`] if a snapshot exists and `overwrite` is false.
    pub fn create_restore_point(&self, overwrite: bool) -> Result<(), ManagerError> {
        let mut state = self.shared.state.lock();
        if state.restore_point.is_some() && !overwrite {
            return Err(ManagerError::Restore("restore point already exists"));
        }
        state.restore_point = Some(state.base.stats.use_rate);
        Ok(())
    }

    /// Replace the use-rate statistic with the snapshot and discard it.
    /// The time of the last retrieval is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::Restore`] if there is no snapshot.
    pub fn restore(&self) -> Result<(), ManagerError> {
        let mut state = self.shared.state.lock();
        let point = state
            .restore_point
            .take()
            .ok_or(ManagerError::Restore("no restore point"))?;
        state.base.stats.use_rate.stat = point.stat;
        Ok(())
    }

    /// Whether a snapshot exists.
    #[must_use]
    pub fn has_restore_point(&self) -> bool {
        self.shared.state.lock().restore_point.is_some()
    }

    /// Callback surface used by the solver service.
    #[must_use]
    pub fn as_owner(&self) -> Arc<dyn JobOwner> {
        self.shared.clone()
    }
}

impl Manager for AutoManager {
    fn id(&self) -> &str {
        &self.shared.id
    }

    fn stop(&self) -> Result<(), ManagerError> {
        self.shared.state.lock().base.request_stop()?;
        tracing::info!(manager = %self.shared.id, "stop requested");
        Ok(())
    }

    fn force_stop(&self) {
        self.shared.state.lock().base.force_finish();
        let dropped = self.shared.results.drain();
        tracing::info!(manager = %self.shared.id, dropped, "force stopped");
    }

    fn flush(&self) -> usize {
        self.shared.results.drain()
    }

    fn status(&self) -> ManagerStatus {
        let mut state = self.shared.state.lock();
        let base = &mut state.base;
        base.stats.refresh();
        ManagerStatus {
            solved: base.solved,
            used: base.used,
            expired: base.expired,
            available: self.shared.results.len(),
            upcoming: base.outstanding(),
            queued: base.queued,
            registered: base.registered,
            waiting_time: base.stats.wait.rate,
            use_interval: base.stats.use_rate.rate(),
            solve_time: base.stats.solve.rate,
            stop_requests: base.stop_requests,
            finished: base.finished,
        }
    }
}

impl std::fmt::Debug for AutoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoManager")
            .field("id", &self.shared.id)
            .field("target", &self.shared.target)
            .finish_non_exhaustive()
    }
}

impl AutoShared {
    /// Put `count` jobs on the queue. `queued` must already include them.
    fn enqueue(self: &Arc<Self>, count: usize) -> Result<(), ManagerError> {
        let owner: Arc<dyn JobOwner> = self.clone();
        for sent in 0..count {
            let job = Job::new(self.target.clone(), None, owner.clone());
            if let Err(e) = self.queue.enqueue(PendingRequest::new(job)) {
                let mut state = self.state.lock();
                state.base.queued = state.base.queued.saturating_sub(count - sent);
                return Err(e.into());
            }
        }
        Ok(())
    }
}

impl JobOwner for AutoShared {
    fn is_stopping(&self) -> bool {
        self.state.lock().base.stop_requests
    }

    fn on_registered(&self, job: &Job) {
        self.state.lock().base.mark_registered();
        tracing::debug!(manager = %self.id, job = %job.id(), "job registered");
    }

    fn on_solved(&self, job: &Job, result: SolvedResult, enqueued_at: Instant) {
        let mut state = self.state.lock();
        state.base.mark_solved(enqueued_at);
        if state.base.finished {
            tracing::debug!(manager = %self.id, job = %job.id(), "finished, result discarded");
            return;
        }
        tracing::debug!(manager = %self.id, job = %job.id(), task = %result.task_id, "job solved");
        self.results.deposit(Delivery::Solved(result));
    }

    fn on_requeued(&self, job: &Job) {
        self.state.lock().base.mark_requeued();
        tracing::warn!(manager = %self.id, job = %job.id(), "job unsolvable, re-queued");
    }

    fn on_failed(&self, job: &Job, stage: JobStage, error: ConfigurationError) {
        let mut state = self.state.lock();
        state.base.release(stage);
        tracing::error!(manager = %self.id, job = %job.id(), %error, "job rejected");
        if !state.base.finished {
            self.results.deposit(Delivery::Failed(error));
        }
    }

    fn on_cancelled(&self, job: &Job, stage: JobStage) {
        self.state.lock().base.release(stage);
        tracing::debug!(manager = %self.id, job = %job.id(), ?stage, "job cancelled");
    }
}
