//! Scriptable in-process solver for tests and demos.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::core::{
    ConfigurationError, PollStatus, Solution, SolverClient, SolverError, SubmitStatus,
    TargetDescriptor, TaskId,
};
use crate::util::clock::{ms_before, now_ms};

/// Behaviour of a [`DummySolver`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DummyConfig {
    /// Delay before every submit and poll reply.
    pub latency: Duration,
    /// Polls answered with `Processing` before a task is ready.
    pub solve_after_polls: u32,
    /// Error returned by every submit.
    pub submit_error: Option<ConfigurationError>,
    /// Error returned by every poll.
    pub poll_error: Option<ConfigurationError>,
    /// Submits answered with `NoSlot` before tasks are accepted.
    pub no_slot: u32,
    /// Submits failing with a transient error before tasks are accepted.
    pub transient: u32,
    /// Polls failing with a transient error before tasks are inspected.
    pub poll_transient: u32,
    /// Ready tasks reported as unsolvable instead.
    pub unsolvable: u32,
    /// Answer every call with an unexpected response.
    pub unexpected: bool,
    /// How long ago reported solutions were solved.
    pub solution_age: Duration,
    /// Cost reported with solutions; `None` leaves it to the default cost.
    pub cost: Option<f64>,
}

impl DummyConfig {
    /// Set the reply delay.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set how many polls a task stays in processing.
    #[must_use]
    pub const fn with_solve_after_polls(mut self, polls: u32) -> Self {
        self.solve_after_polls = polls;
        self
    }

    /// Fail every submit with `error`.
    #[must_use]
    pub const fn with_submit_error(mut self, error: ConfigurationError) -> Self {
        self.submit_error = Some(error);
        self
    }

    /// Fail every poll with `error`.
    #[must_use]
    pub const fn with_poll_error(mut self, error: ConfigurationError) -> Self {
        self.poll_error = Some(error);
        self
    }

    /// Answer the first `count` submits with `NoSlot`.
    #[must_use]
    pub const fn with_no_slot(mut self, count: u32) -> Self {
        self.no_slot = count;
        self
    }

    /// Fail the first `count` submits transiently.
    #[must_use]
    pub const fn with_transient(mut self, count: u32) -> Self {
        self.transient = count;
        self
    }

    /// Fail the first `count` polls transiently.
    #[must_use]
    pub const fn with_poll_transient(mut self, count: u32) -> Self {
        self.poll_transient = count;
        self
    }

    /// Report the first `count` ready tasks as unsolvable.
    #[must_use]
    pub const fn with_unsolvable(mut self, count: u32) -> Self {
        self.unsolvable = count;
        self
    }

    /// Answer every call with an unexpected response.
    #[must_use]
    pub const fn with_unexpected(mut self) -> Self {
        self.unexpected = true;
        self
    }

    /// Report solutions as solved `age` ago.
    #[must_use]
    pub const fn with_solution_age(mut self, age: Duration) -> Self {
        self.solution_age = age;
        self
    }

    /// Report `cost` with every solution.
    #[must_use]
    pub const fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }
}

#[derive(Debug, Default)]
struct DummyState {
    tasks: HashMap<TaskId, u32>,
    submissions: usize,
    polls: usize,
    no_slot_left: u32,
    transient_left: u32,
    poll_transient_left: u32,
    unsolvable_left: u32,
}

/// In-process solver following a [`DummyConfig`]. Clones share state.
#[derive(Debug, Clone)]
pub struct DummySolver {
    config: DummyConfig,
    state: Arc<Mutex<DummyState>>,
}

impl DummySolver {
    /// Default cost of a dummy solution.
    pub const DEFAULT_COST: f64 = 0.002;

    /// Create a solver following `config`.
    #[must_use]
    pub fn new(config: DummyConfig) -> Self {
        let state = DummyState {
            no_slot_left: config.no_slot,
            transient_left: config.transient,
            poll_transient_left: config.poll_transient,
            unsolvable_left: config.unsolvable,
            ..DummyState::default()
        };
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Submit calls received so far.
    #[must_use]
    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    /// Poll calls received so far.
    #[must_use]
    pub fn polls(&self) -> usize {
        self.state.lock().polls
    }

    /// Tasks registered and not yet answered.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.state.lock().tasks.len()
    }

    async fn delay(&self) {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
    }
}

impl Default for DummySolver {
    fn default() -> Self {
        Self::new(DummyConfig::default())
    }
}

#[async_trait]
impl SolverClient for DummySolver {
    fn name(&self) -> &str {
        "dummy"
    }

    fn default_cost(&self) -> f64 {
        Self::DEFAULT_COST
    }

    async fn submit(&self, target: &TargetDescriptor) -> Result<SubmitStatus, SolverError> {
        self.delay().await;
        let mut state = self.state.lock();
        state.submissions += 1;

        if self.config.unexpected {
            return Err(SolverError::UnexpectedResponse(format!("no task id for {target}")));
        }
        if let Some(error) = self.config.submit_error {
            return Err(error.into());
        }
        if state.transient_left > 0 {
            state.transient_left -= 1;
            return Err(SolverError::Transient("connection reset".into()));
        }
        if state.no_slot_left > 0 {
            state.no_slot_left -= 1;
            return Ok(SubmitStatus::NoSlot);
        }

        let task = Uuid::new_v4().to_string();
        state.tasks.insert(task.clone(), 0);
        Ok(SubmitStatus::Registered(task))
    }

    async fn poll(&self, task: &TaskId) -> Result<PollStatus, SolverError> {
        self.delay().await;
        let mut state = self.state.lock();
        state.polls += 1;

        if self.config.unexpected {
            return Err(SolverError::UnexpectedResponse(format!("no status for {task}")));
        }
        if let Some(error) = self.config.poll_error {
            return Err(error.into());
        }
        if state.poll_transient_left > 0 {
            state.poll_transient_left -= 1;
            return Err(SolverError::Transient("poll timed out upstream".into()));
        }

        let Some(polls) = state.tasks.get_mut(task) else {
            return Err(SolverError::UnexpectedResponse(format!("unknown task {task}")));
        };
        *polls += 1;
        if *polls <= self.config.solve_after_polls {
            return Ok(PollStatus::Processing);
        }

        state.tasks.remove(task);
        if state.unsolvable_left > 0 {
            state.unsolvable_left -= 1;
            return Ok(PollStatus::Unsolvable);
        }
        Ok(PollStatus::Ready(Solution {
            answer: format!("token-{task}"),
            cost: self.config.cost,
            solved_at_ms: Some(ms_before(now_ms(), self.config.solution_age)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> TargetDescriptor {
        TargetDescriptor::v2("https://test.com", "key", false)
    }

    #[tokio::test]
    async fn test_submit_then_poll_until_ready() {
        let config = DummyConfig::default().with_solve_after_polls(2).with_cost(0.5);
        let solver = DummySolver::new(config);
        let SubmitStatus::Registered(task) = solver.submit(&target()).await.unwrap() else {
            panic!("expected registration");
        };
        assert_eq!(solver.poll(&task).await.unwrap(), PollStatus::Processing);
        assert_eq!(solver.poll(&task).await.unwrap(), PollStatus::Processing);
        match solver.poll(&task).await.unwrap() {
            PollStatus::Ready(solution) => assert_eq!(solution.cost, Some(0.5)),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(solver.pending_tasks(), 0);
        assert_eq!(solver.polls(), 3);
    }

    #[tokio::test]
    async fn test_scripted_failures_run_out() {
        let solver = DummySolver::new(DummyConfig::default().with_transient(1).with_no_slot(1));
        assert!(matches!(solver.submit(&target()).await, Err(SolverError::Transient(_))));
        assert_eq!(solver.submit(&target()).await.unwrap(), SubmitStatus::NoSlot);
        assert!(matches!(solver.submit(&target()).await, Ok(SubmitStatus::Registered(_))));
        assert_eq!(solver.submissions(), 3);
    }

    #[tokio::test]
    async fn test_poll_transients_leave_task_untouched() {
        let solver = DummySolver::new(DummyConfig::default().with_poll_transient(2));
        let SubmitStatus::Registered(task) = solver.submit(&target()).await.unwrap() else {
            panic!("expected registration");
        };
        assert!(matches!(solver.poll(&task).await, Err(SolverError::Transient(_))));
        assert!(matches!(solver.poll(&task).await, Err(SolverError::Transient(_))));
        assert!(matches!(solver.poll(&task).await, Ok(PollStatus::Ready(_))));
        assert_eq!(solver.polls(), 3);
    }

    #[tokio::test]
    async fn test_configuration_errors() {
        let config = DummyConfig::default().with_submit_error(ConfigurationError::NoBalance);
        let solver = DummySolver::new(config);
        assert_eq!(
            solver.submit(&target()).await,
            Err(SolverError::Configuration(ConfigurationError::NoBalance))
        );
    }

    #[tokio::test]
    async fn test_unknown_task_is_unexpected() {
        let solver = DummySolver::default();
        assert!(matches!(
            solver.poll(&"missing".to_string()).await,
            Err(SolverError::UnexpectedResponse(_))
        ));
    }
}
