//! Solver service: drives jobs from the job queue through a [`SolverClient`].
//!
//! The service runs on a dedicated OS thread with its own single-threaded
//! tokio runtime, so solver I/O never competes with the caller's runtime and
//! managers can be used from plain threads.
//!
//! One cycle of the loop:
//!
//! 1. drain the job queue into the in-flight list
//! 2. cancel jobs whose manager is stopping
//! 3. submit the rest concurrently, each call bounded by `call_timeout`
//! 4. after `poll_interval`, poll every registered task concurrently
//!
//! Configuration errors and unexpected responses end the loop. Transient
//! errors and timeouts end it too unless the [`ErrorHandler`] asks to resume.
//! On exit every job still held is cancelled so manager counters stay exact.

mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{error, info};

use crate::config::ServiceConfig;
use crate::core::{ServiceError, SolverClient, SolverError};
use crate::infra::JobQueue;

use worker::Worker;

/// Decides whether the service resumes after a transient error.
/// Returning `true` keeps the loop running.
pub type ErrorHandler = Arc<dyn Fn(&SolverError) -> bool + Send + Sync>;

/// Background worker bound to one solver and one job queue.
pub struct SolverService<C: SolverClient> {
    solver: Arc<C>,
    queue: JobQueue,
    config: ServiceConfig,
    shutdown: Arc<AtomicBool>,
    spawned: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
    failure: Arc<Mutex<Option<ServiceError>>>,
}

impl<C: SolverClient> SolverService<C> {
    /// Create a service; nothing runs until [`SolverService::spawn`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidConfig`] if `config` does not validate.
    pub fn new(solver: C, queue: &JobQueue, config: ServiceConfig) -> Result<Self, ServiceError> {
        config.validate().map_err(ServiceError::InvalidConfig)?;
        Ok(Self {
            solver: Arc::new(solver),
            queue: queue.clone(),
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            spawned: AtomicBool::new(false),
            handle: Mutex::new(None),
            failure: Arc::new(Mutex::new(None)),
        })
    }

    /// Start the worker thread. A service can be spawned once.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::AlreadySpawned`] on a second call.
    /// - [`ServiceError::Runtime`] if the thread could not be started.
    pub fn spawn(&self, handler: Option<ErrorHandler>) -> Result<(), ServiceError> {
        if self.spawned.swap(true, Ordering::AcqRel) {
            return Err(ServiceError::AlreadySpawned);
        }

        let worker = Worker::new(
            Arc::clone(&self.solver),
            self.queue.clone(),
            self.config.clone(),
            Arc::clone(&self.shutdown),
            handler,
        );
        let failure = Arc::clone(&self.failure);
        let name = self.solver.name().to_owned();

        let handle = thread::Builder::new()
            .name(format!("solver-{name}"))
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!(solver = %name, error = %e, "failed to create solver runtime");
                        *failure.lock() = Some(ServiceError::Runtime(e.to_string()));
                        return;
                    }
                };

                if let Err(e) = rt.block_on(worker.run()) {
                    error!(solver = %name, error = %e, "solver service terminated");
                    *failure.lock() = Some(e.into());
                }
            })
            .map_err(|e| ServiceError::Runtime(e.to_string()))?;

        *self.handle.lock() = Some(handle);
        info!(solver = self.solver.name(), "solver service spawned");
        Ok(())
    }

    /// Ask the loop to exit after the current step.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// Wait for the worker thread to exit and report how it ended.
    ///
    /// # Errors
    ///
    /// Returns the error that terminated the loop, or
    /// [`ServiceError::Panicked`] if the thread panicked.
    pub fn join(&self) -> Result<(), ServiceError> {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            handle.join().map_err(|_| ServiceError::Panicked)?;
        }
        self.check()
    }

    /// Whether the worker thread is running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.handle.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Re-raise the error that terminated the loop, if any.
    ///
    /// # Errors
    ///
    /// Returns a copy of the stored error.
    pub fn check(&self) -> Result<(), ServiceError> {
        self.failure.lock().clone().map_or(Ok(()), Err)
    }

    /// The solver this service drives.
    #[must_use]
    pub fn solver(&self) -> &C {
        &self.solver
    }
}

impl<C: SolverClient> Drop for SolverService<C> {
    fn drop(&mut self) {
        self.stop();
        let handle = self.handle.get_mut().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}
