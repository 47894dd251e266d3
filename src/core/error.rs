//! Error types for managers, solvers and the solver service.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::batch::BatchKey;
use crate::infra::queue::QueueError;

/// Rejections reported by a solving provider that retrying cannot fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationError {
    /// The provider rejected the target domain (or the domain/site-key pair).
    #[error("provided domain is incorrect")]
    BadDomain,
    /// The provider rejected the site key (or the domain/site-key pair).
    #[error("provided site key is incorrect")]
    BadSiteKey,
    /// The API credential is unknown to the provider.
    #[error("API key provided is incorrect")]
    BadCredential,
    /// Account balance is insufficient to create tasks.
    #[error("balance insufficient")]
    NoBalance,
    /// The account bid is below the provider's current minimum.
    #[error("bid too low, raise bid from account settings or use a different provider")]
    LowBid,
}

impl ConfigurationError {
    /// Map a well-known provider error code to a configuration error.
    ///
    /// `ERROR_NO_SLOT_AVAILABLE` maps to [`ConfigurationError::LowBid`]; only
    /// bidding providers should route that code here; others treat it as a
    /// transient no-slot reply.
    #[must_use]
    pub fn from_provider_code(code: &str) -> Option<Self> {
        match code {
            "ERROR_RECAPTCHA_INVALID_DOMAIN" | "ERROR_BAD_TOKEN_OR_PAGEURL" => {
                Some(Self::BadDomain)
            }
            "ERROR_RECAPTCHA_INVALID_SITEKEY" | "ERROR_GOOGLEKEY" => Some(Self::BadSiteKey),
            "ERROR_KEY_DOES_NOT_EXIST" | "ERROR_WRONG_USER_KEY" => Some(Self::BadCredential),
            "ERROR_ZERO_BALANCE" => Some(Self::NoBalance),
            "ERROR_NO_SLOT_AVAILABLE" => Some(Self::LowBid),
            _ => None,
        }
    }
}

/// Classified failure of a single submit or poll call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// Non-retryable rejection; escalates immediately.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Temporary provider or transport failure.
    #[error("transient solver error: {0}")]
    Transient(String),
    /// The provider replied with something that does not match its contract.
    #[error("unexpected response from solver: {0}")]
    UnexpectedResponse(String),
    /// The call did not resolve within the per-call timeout.
    #[error("solver call timed out after {0:?}")]
    Timeout(Duration),
}

impl SolverError {
    /// Whether an error handler may choose to resume after this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

/// Errors raised to callers of manager operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManagerError {
    /// No further results will ever be produced by this manager.
    #[error("manager exhausted: no further results will be produced")]
    Exhausted,
    /// The caller's deadline elapsed; work may still arrive later.
    #[error("timed out after {0:?} waiting for a result")]
    TimedOut(Duration),
    /// No work is outstanding for the batch and the caller asked not to wait.
    #[error("no outstanding work for batch {0}")]
    Empty(BatchKey),
    /// The batch key was never registered with this manager.
    #[error("unknown batch key: {0}")]
    UnknownBatch(BatchKey),
    /// Restore point misuse.
    #[error("restore point error: {0}")]
    Restore(&'static str),
    /// The target descriptor failed validation.
    #[error("invalid target descriptor: {0}")]
    InvalidDescriptor(String),
    /// An argument was out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The manager already reached its terminal state.
    #[error("manager already finished")]
    AlreadyFinished,
    /// The solver rejected a job with a configuration error.
    #[error("job rejected by solver: {0}")]
    Rejected(#[from] ConfigurationError),
    /// The job queue was closed.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Errors that terminate or prevent running a solver service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// A fatal or unhandled solver error stopped the worker loop.
    #[error("solver service stopped: {0}")]
    Solver(#[from] SolverError),
    /// `spawn` was called on a service that was already spawned once.
    #[error("solver service was already spawned")]
    AlreadySpawned,
    /// The service configuration failed validation.
    #[error("invalid service configuration: {0}")]
    InvalidConfig(String),
    /// The worker runtime or thread could not be created.
    #[error("solver service runtime error: {0}")]
    Runtime(String),
    /// The worker thread panicked.
    #[error("solver service thread panicked")]
    Panicked,
}

impl ServiceError {
    /// The configuration error behind this failure, if any.
    #[must_use]
    pub const fn configuration(&self) -> Option<ConfigurationError> {
        match self {
            Self::Solver(SolverError::Configuration(e)) => Some(*e),
            _ => None,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
