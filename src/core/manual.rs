//! Batch-keyed manager: callers choose how many jobs to send per target.
//!
//! Jobs whose targets normalise to the same [`BatchKey`] share one
//! outstanding count and one result buffer, so many logical callers can
//! draw from one stream. Waiters block on a condition variable that every
//! delivery, cancellation and stop notifies.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use uuid::Uuid;

use crate::config::ManagerConfig;
use crate::core::batch::{batch_key, BatchKey, BatchRegistry};
use crate::core::manager::{deadline_after, is_stale, next_wait};
use crate::core::{
    ConfigurationError, Job, JobOwner, JobStage, Manager, ManagerError, ManagerState, ManagerStatus,
    PendingRequest, SolvedResult, TargetDescriptor,
};
use crate::infra::JobQueue;

struct ManualState {
    base: ManagerState,
    batches: BatchRegistry,
}

struct ManualShared {
    id: String,
    config: ManagerConfig,
    queue: JobQueue,
    state: Mutex<ManualState>,
    ready: Condvar,
}

/// Handle to a batch-keyed manager.
#[derive(Clone)]
pub struct ManualManager {
    shared: Arc<ManualShared>,
}

impl ManualManager {
    /// Create a manager feeding `queue`.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::InvalidArgument`] if `config` does not validate.
    pub fn create(queue: &JobQueue, config: ManagerConfig) -> Result<Self, ManagerError> {
        Self::create_named(queue, Uuid::new_v4().to_string(), config)
    }

    /// Same as [`ManualManager::create`] with an explicit identifier for logs.
    ///
    /// # Errors
    ///
    /// See [`ManualManager::create`].
    pub fn create_named(
        queue: &JobQueue,
        id: impl Into<String>,
        config: ManagerConfig,
    ) -> Result<Self, ManagerError> {
        config.validate().map_err(ManagerError::InvalidArgument)?;
        let id = id.into();
        tracing::info!(manager = %id, "manual manager created");
        Ok(Self {
            shared: Arc::new(ManualShared {
                id,
                config,
                queue: queue.clone(),
                state: Mutex::new(ManualState {
                    base: ManagerState::new(Instant::now()),
                    batches: BatchRegistry::new(),
                }),
                ready: Condvar::new(),
            }),
        })
    }

    /// Send `count` jobs for `target` and return their batch key, or `None`
    /// once the manager is stopped.
    ///
    /// Only the URL origin takes part in the key unless `force_path` is set.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::InvalidArgument`] if `count` is 0.
    /// - [`ManagerError::InvalidDescriptor`] if `target` does not validate.
    /// - [`ManagerError::Queue`] if the job queue was closed; unsent jobs are
    ///   not counted against the batch.
    pub fn send_request(
        &self,
        target: TargetDescriptor,
        count: usize,
        force_path: bool,
    ) -> Result<Option<BatchKey>, ManagerError> {
        if count == 0 {
            return Err(ManagerError::InvalidArgument("count must be greater than 0".into()));
        }
        let key = batch_key(&target, force_path)?;
        let shared = &self.shared;
        {
            let mut state = shared.state.lock();
            if state.base.stop_requests {
                return Ok(None);
            }
            state.base.queued += count;
            state.batches.register(&key, count);
        }

        tracing::debug!(manager = %shared.id, batch = %key, count, "sending jobs");
        let target = Arc::new(target);
        let owner: Arc<dyn JobOwner> = shared.clone();
        for sent in 0..count {
            let job = Job::new(target.clone(), Some(key.clone()), owner.clone());
            if let Err(e) = shared.queue.enqueue(PendingRequest::new(job)) {
                let mut state = shared.state.lock();
                let unsent = count - sent;
                state.base.queued = state.base.queued.saturating_sub(unsent);
                if let Some(entry) = state.batches.get_mut(&key) {
                    entry.outstanding = entry.outstanding.saturating_sub(unsent);
                }
                return Err(e.into());
            }
        }
        Ok(Some(key))
    }

    /// Retrieve one fresh result for `key`, blocking up to `max_block`
    /// (forever if `None`).
    ///
    /// # Errors
    ///
    /// - [`ManagerError::UnknownBatch`] if `key` was never sent.
    /// - [`ManagerError::Exhausted`] once the manager is finished, or stopped
    ///   with no work left.
    /// - [`ManagerError::Rejected`] when the solver rejected a job of this batch.
    /// - [`ManagerError::Empty`] if `force_return` is set and nothing is
    ///   outstanding for `key`.
    /// - [`ManagerError::TimedOut`] when `max_block` elapses first.
    pub fn get_request(
        &self,
        key: &BatchKey,
        max_block: Option<Duration>,
        force_return: bool,
    ) -> Result<SolvedResult, ManagerError> {
        let shared = &self.shared;
        let start = Instant::now();
        let deadline = deadline_after(start, max_block);

        let mut state = shared.state.lock();
        if !state.batches.contains(key) {
            return Err(ManagerError::UnknownBatch(key.clone()));
        }
        if !state.base.finished {
            state.base.stats.use_rate.record_call(start);
        }

        loop {
            if let Some(outcome) = shared.take(&mut state, key, force_return, start) {
                return outcome;
            }
            let Some(wait) = next_wait(shared.config.wait_slice(), deadline, Instant::now()) else {
                state.base.stats.use_rate.touch(Instant::now());
                return Err(ManagerError::TimedOut(max_block.unwrap_or_default()));
            };
            shared.ready.wait_for(&mut state, wait);
        }
    }

    /// Buffered results for `key`, or across every key.
    #[must_use]
    pub fn available(&self, key: Option<&BatchKey>) -> usize {
        self.shared.state.lock().batches.available(key)
    }

    /// Outstanding jobs without a buffered result for `key`, or across every key.
    #[must_use]
    pub fn being_solved(&self, key: Option<&BatchKey>) -> usize {
        self.shared.state.lock().batches.being_solved(key)
    }

    /// Callback surface used by the solver service.
    #[must_use]
    pub fn as_owner(&self) -> Arc<dyn JobOwner> {
        self.shared.clone()
    }
}

impl ManualShared {
    /// One pass over the state for `key`. `None` means keep waiting.
    fn take(
        &self,
        state: &mut ManualState,
        key: &BatchKey,
        force_return: bool,
        start: Instant,
    ) -> Option<Result<SolvedResult, ManagerError>> {
        let ManualState { base, batches } = state;
        if base.finished {
            return Some(Err(ManagerError::Exhausted));
        }

        let entry = batches.get_mut(key)?;
        if let Some(error) = entry.failures.pop_front() {
            entry.outstanding = entry.outstanding.saturating_sub(1);
            base.stats.use_rate.touch(Instant::now());
            return Some(Err(ManagerError::Rejected(error)));
        }
        while let Some(result) = entry.results.pop_front() {
            entry.outstanding = entry.outstanding.saturating_sub(1);
            if is_stale(&result, self.config.stale_after()) {
                base.expired += 1;
                tracing::warn!(
                    manager = %self.id,
                    batch = %key,
                    task = %result.task_id,
                    "discarding expired result"
                );
                continue;
            }
            base.mark_used(start, Instant::now());
            return Some(Ok(result));
        }
        let key_outstanding = entry.outstanding;

        if base.stop_requests && batches.total_outstanding() == 0 {
            base.finished = true;
            return Some(Err(ManagerError::Exhausted));
        }
        if force_return && key_outstanding == 0 {
            return Some(Err(ManagerError::Empty(key.clone())));
        }
        None
    }
}

impl Manager for ManualManager {
    fn id(&self) -> &str {
        &self.shared.id
    }

    fn stop(&self) -> Result<(), ManagerError> {
        self.shared.state.lock().base.request_stop()?;
        self.shared.ready.notify_all();
        tracing::info!(manager = %self.shared.id, "stop requested");
        Ok(())
    }

    fn force_stop(&self) {
        let dropped = {
            let mut state = self.shared.state.lock();
            state.base.force_finish();
            state.batches.clear_buffers()
        };
        self.shared.ready.notify_all();
        tracing::info!(manager = %self.shared.id, dropped, "force stopped");
    }

    fn flush(&self) -> usize {
        let cleared = self.shared.state.lock().batches.clear_buffers();
        self.shared.ready.notify_all();
        cleared
    }

    fn status(&self) -> ManagerStatus {
        let mut state = self.shared.state.lock();
        let ManualState { base, batches } = &mut *state;
        base.stats.refresh();
        ManagerStatus {
            solved: base.solved,
            used: base.used,
            expired: base.expired,
            available: batches.available(None),
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

impl std::fmt::Debug for ManualManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualManager")
            .field("id", &self.shared.id)
            .finish_non_exhaustive()
    }
}

impl JobOwner for ManualShared {
    fn is_stopping(&self) -> bool {
        self.state.lock().base.stop_requests
    }

    fn on_registered(&self, job: &Job) {
        self.state.lock().base.mark_registered();
        tracing::debug!(manager = %self.id, job = %job.id(), "job registered");
    }

    fn on_solved(&self, job: &Job, result: SolvedResult, enqueued_at: Instant) {
        {
            let mut state = self.state.lock();
            state.base.mark_solved(enqueued_at);
            let Some(key) = job.batch() else {
                tracing::error!(manager = %self.id, job = %job.id(), "solved job has no batch key");
                return;
            };
            if state.base.finished {
                state.batches.release(key);
                tracing::debug!(manager = %self.id, job = %job.id(), "finished, result discarded");
            } else {
                tracing::debug!(
                    manager = %self.id,
                    job = %job.id(),
                    batch = %key,
                    task = %result.task_id,
                    "job solved"
                );
                state.batches.deliver(key, result);
            }
        }
        self.ready.notify_all();
    }

    fn on_requeued(&self, job: &Job) {
        self.state.lock().base.mark_requeued();
        tracing::warn!(manager = %self.id, job = %job.id(), "job unsolvable, re-queued");
    }

    fn on_failed(&self, job: &Job, stage: JobStage, error: ConfigurationError) {
        {
            let mut state = self.state.lock();
            state.base.release(stage);
            tracing::error!(manager = %self.id, job = %job.id(), %error, "job rejected");
            if let Some(key) = job.batch() {
                if state.base.finished {
                    state.batches.release(key);
                } else {
                    state.batches.fail(key, error);
                }
            }
        }
        self.ready.notify_all();
    }

    fn on_cancelled(&self, job: &Job, stage: JobStage) {
        {
            let mut state = self.state.lock();
            state.base.release(stage);
            if let Some(key) = job.batch() {
                state.batches.release(key);
            }
        }
        self.ready.notify_all();
        tracing::debug!(manager = %self.id, job = %job.id(), ?stage, "job cancelled");
    }
}
