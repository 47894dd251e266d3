//! Jobs, pending requests and the callback surface managers expose to the
//! solver service.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::batch::BatchKey;
use crate::core::{ConfigurationError, TargetDescriptor};

/// Unique job identifier, used for log correlation.
pub type JobId = Uuid;

/// Provider-assigned task identifier.
pub type TaskId = String;

/// Where a job sits in its owner's accounting when the service acts on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Counted in the owner's `queued` counter.
    Queued,
    /// Counted in the owner's `registered` counter.
    Registered,
}

/// Manager-side callbacks used by the solver service to reconcile counters
/// and deliver outcomes. Every callback runs under the owner's lock.
pub trait JobOwner: Send + Sync + 'static {
    /// Whether the owner stopped accepting new submissions.
    fn is_stopping(&self) -> bool;

    /// The solver accepted the job: `queued -= 1`, `registered += 1`.
    fn on_registered(&self, job: &Job);

    /// The job produced an answer. `enqueued_at` is when the request last
    /// entered the job queue.
    fn on_solved(&self, job: &Job, result: SolvedResult, enqueued_at: Instant);

    /// The solver gave up on the job and the service is re-enqueueing it:
    /// `registered -= 1`, `queued += 1`.
    fn on_requeued(&self, job: &Job);

    /// The job was rejected with a non-retryable error.
    fn on_failed(&self, job: &Job, stage: JobStage, error: ConfigurationError);

    /// The job was dropped without an outcome.
    fn on_cancelled(&self, job: &Job, stage: JobStage);
}

/// One unit of work: solve `target` on behalf of `owner`.
#[derive(Clone)]
pub struct Job {
    id: JobId,
    target: Arc<TargetDescriptor>,
    batch: Option<BatchKey>,
    owner: Arc<dyn JobOwner>,
}

impl Job {
    /// Create a job for `owner`.
    pub fn new(
        target: Arc<TargetDescriptor>,
        batch: Option<BatchKey>,
        owner: Arc<dyn JobOwner>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            batch,
            owner,
        }
    }

    /// Job identifier.
    #[must_use]
    pub const fn id(&self) -> JobId {
        self.id
    }

    /// What the solver is asked to solve.
    #[must_use]
    pub fn target(&self) -> &TargetDescriptor {
        &self.target
    }

    /// Batch key for batch-keyed managers.
    #[must_use]
    pub const fn batch(&self) -> Option<&BatchKey> {
        self.batch.as_ref()
    }

    /// The manager that receives this job's outcome.
    #[must_use]
    pub fn owner(&self) -> &Arc<dyn JobOwner> {
        &self.owner
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

/// A job plus the moment it entered the job queue.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// The job.
    pub job: Job,
    /// When the request was enqueued.
    pub enqueued_at: Instant,
}

impl PendingRequest {
    /// Wrap a job, stamping the current time.
    #[must_use]
    pub fn new(job: Job) -> Self {
        Self {
            job,
            enqueued_at: Instant::now(),
        }
    }
}

/// Answer produced by the solver for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolvedResult {
    /// Provider task identifier.
    pub task_id: TaskId,
    /// Answer token.
    pub answer: String,
    /// When the provider solved the task (ms since epoch).
    pub solved_at_ms: u128,
    /// Cost charged for the task.
    pub cost: f64,
    /// When the result was deposited for the owner (ms since epoch).
    pub delivered_at_ms: u128,
}
