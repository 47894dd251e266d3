//! The solver service loop.

use std::future::Future;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::config::ServiceConfig;
use crate::core::{
    JobStage, PendingRequest, PollStatus, SolvedResult, SolverClient, SolverError, SubmitStatus,
    TaskId,
};
use crate::infra::JobQueue;
use crate::util::clock::now_ms;

use super::ErrorHandler;

const PAUSE_STEP: Duration = Duration::from_millis(50);

/// A job the solver accepted, waiting for its answer.
struct Awaiting {
    request: PendingRequest,
    task: TaskId,
}

pub(super) struct Worker<C> {
    solver: Arc<C>,
    queue: JobQueue,
    config: ServiceConfig,
    shutdown: Arc<AtomicBool>,
    handler: Option<ErrorHandler>,
}

impl<C: SolverClient> Worker<C> {
    pub(super) fn new(
        solver: Arc<C>,
        queue: JobQueue,
        config: ServiceConfig,
        shutdown: Arc<AtomicBool>,
        handler: Option<ErrorHandler>,
    ) -> Self {
        Self {
            solver,
            queue,
            config,
            shutdown,
            handler,
        }
    }

    /// Run until stopped or a fatal error, then cancel every job still held.
    pub(super) async fn run(self) -> Result<(), SolverError> {
        info!(solver = self.solver.name(), "solver loop started");
        let mut in_flight = Vec::new();
        let mut awaiting = Vec::new();

        let outcome = self.cycle(&mut in_flight, &mut awaiting).await;

        let cancelled = in_flight.len() + awaiting.len();
        for request in in_flight {
            request.job.owner().on_cancelled(&request.job, JobStage::Queued);
        }
        for entry in awaiting {
            let job = &entry.request.job;
            job.owner().on_cancelled(job, JobStage::Registered);
        }
        info!(solver = self.solver.name(), cancelled, ok = outcome.is_ok(), "solver loop stopped");
        outcome
    }

    fn stopped(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    async fn cycle(
        &self,
        in_flight: &mut Vec<PendingRequest>,
        awaiting: &mut Vec<Awaiting>,
    ) -> Result<(), SolverError> {
        while !self.stopped() {
            in_flight.extend(self.queue.drain());
            if in_flight.is_empty() && awaiting.is_empty() {
                self.pause(self.config.idle_sleep()).await;
                continue;
            }

            in_flight.retain(|request| {
                let owner = request.job.owner();
                if owner.is_stopping() {
                    owner.on_cancelled(&request.job, JobStage::Queued);
                    false
                } else {
                    true
                }
            });

            if !in_flight.is_empty() {
                self.submit_pass(in_flight, awaiting).await?;
            }

            if awaiting.is_empty() {
                self.pause(self.config.submit_interval()).await;
            } else {
                self.pause(self.config.poll_interval()).await;
                if self.stopped() {
                    break;
                }
                self.poll_pass(awaiting).await?;
            }
        }
        Ok(())
    }

    async fn submit_pass(
        &self,
        in_flight: &mut Vec<PendingRequest>,
        awaiting: &mut Vec<Awaiting>,
    ) -> Result<(), SolverError> {
        let requests = mem::take(in_flight);
        let replies = join_all(
            requests
                .iter()
                .map(|request| self.bounded(self.solver.submit(request.job.target()))),
        )
        .await;

        let mut fatal = None;
        for (request, reply) in requests.into_iter().zip(replies) {
            let job = &request.job;
            match reply {
                Ok(SubmitStatus::Registered(task)) => {
                    job.owner().on_registered(job);
                    debug!(
                        solver = self.solver.name(),
                        job = %job.id(),
                        task = %task,
                        "task registered"
                    );
                    awaiting.push(Awaiting { request, task });
                }
                Ok(SubmitStatus::NoSlot) => {
                    debug!(solver = self.solver.name(), job = %job.id(), "no slot available");
                    in_flight.push(request);
                }
                Err(SolverError::Configuration(e)) => {
                    job.owner().on_failed(job, JobStage::Queued, e);
                    fatal.get_or_insert(SolverError::Configuration(e));
                }
                Err(e) => {
                    if !self.recover(&e) {
                        fatal.get_or_insert(e);
                    }
                    in_flight.push(request);
                }
            }
        }
        fatal.map_or(Ok(()), Err)
    }

    async fn poll_pass(&self, awaiting: &mut Vec<Awaiting>) -> Result<(), SolverError> {
        let entries = mem::take(awaiting);
        let replies = join_all(
            entries
                .iter()
                .map(|entry| self.bounded(self.solver.poll(&entry.task))),
        )
        .await;

        let mut fatal = None;
        for (entry, reply) in entries.into_iter().zip(replies) {
            let job = &entry.request.job;
            match reply {
                Ok(PollStatus::Ready(solution)) => {
                    let now = now_ms();
                    let result = SolvedResult {
                        task_id: entry.task.clone(),
                        answer: solution.answer,
                        solved_at_ms: solution.solved_at_ms.unwrap_or(now),
                        cost: solution.cost.unwrap_or_else(|| self.solver.default_cost()),
                        delivered_at_ms: now,
                    };
                    debug!(
                        solver = self.solver.name(),
                        job = %job.id(),
                        task = %entry.task,
                        "task solved"
                    );
                    job.owner().on_solved(job, result, entry.request.enqueued_at);
                }
                Ok(PollStatus::Processing) => awaiting.push(entry),
                Ok(PollStatus::Unsolvable) => {
                    job.owner().on_requeued(job);
                    if let Err(e) = self.queue.enqueue(PendingRequest::new(job.clone())) {
                        warn!(
                            solver = self.solver.name(),
                            job = %job.id(),
                            error = %e,
                            "re-queue failed"
                        );
                        job.owner().on_cancelled(job, JobStage::Queued);
                    }
                }
                Err(SolverError::Configuration(e)) => {
                    job.owner().on_failed(job, JobStage::Registered, e);
                    fatal.get_or_insert(SolverError::Configuration(e));
                }
                Err(e) => {
                    if !self.recover(&e) {
                        fatal.get_or_insert(e);
                    }
                    awaiting.push(entry);
                }
            }
        }
        fatal.map_or(Ok(()), Err)
    }

    /// Whether the loop may continue after `error`.
    fn recover(&self, error: &SolverError) -> bool {
        let resumed = error.is_recoverable()
            && self.handler.as_ref().is_some_and(|handler| handler(error));
        if resumed {
            warn!(solver = self.solver.name(), %error, "solver error handled, resuming");
        } else {
            error!(solver = self.solver.name(), %error, "unhandled solver error");
        }
        resumed
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, SolverError>>,
    ) -> Result<T, SolverError> {
        let limit = self.config.call_timeout();
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(SolverError::Timeout(limit)))
    }

    /// Sleep up to `duration`, waking early once stopped.
    async fn pause(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.stopped() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep(PAUSE_STEP.min(deadline - now)).await;
        }
    }
}
