//! Capability interface to an external solving provider.
//!
//! Providers expose a two-phase protocol: `submit` registers a task and
//! returns its identifier, `poll` reports whether the answer is ready.
//! Implementations classify every failure into a [`SolverError`] so the
//! service loop can decide between retrying, re-queueing and terminating.

use async_trait::async_trait;

use crate::core::{SolverError, TargetDescriptor, TaskId};

/// Reply to a submit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    /// The provider accepted the task.
    Registered(TaskId),
    /// No worker slot is free right now; try again next cycle.
    NoSlot,
}

/// Answer reported by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Answer token.
    pub answer: String,
    /// Charged cost, when the provider reports one.
    pub cost: Option<f64>,
    /// When the provider finished the task (ms since epoch), when reported.
    pub solved_at_ms: Option<u128>,
}

/// Reply to a poll call.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus {
    /// The task is still being worked on.
    Processing,
    /// The answer is ready.
    Ready(Solution),
    /// The provider gave up on this task; submitting it again may succeed.
    Unsolvable,
}

/// One solving provider.
#[async_trait]
pub trait SolverClient: Send + Sync + 'static {
    /// Provider name used in logs.
    fn name(&self) -> &str;

    /// Cost assumed when a solution does not report one.
    fn default_cost(&self) -> f64;

    /// Register a task for `target`.
    async fn submit(&self, target: &TargetDescriptor) -> Result<SubmitStatus, SolverError>;

    /// Check on a registered task.
    async fn poll(&self, task: &TaskId) -> Result<PollStatus, SolverError>;
}
