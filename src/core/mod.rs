//! Core domain: managers, statistics, pacing and the solver service.

pub mod auto;
pub mod batch;
pub mod descriptor;
pub mod error;
pub mod job;
pub mod manager;
pub mod manual;
pub mod pacing;
pub mod service;
pub mod solver;
pub mod stats;

pub use auto::AutoManager;
pub use batch::{batch_key, BatchEntry, BatchKey, BatchRegistry};
pub use descriptor::{TargetDescriptor, Variant};
pub use error::{AppResult, ConfigurationError, ManagerError, ServiceError, SolverError};
pub use job::{Job, JobId, JobOwner, JobStage, PendingRequest, SolvedResult, TaskId};
pub use manager::{Manager, ManagerState, ManagerStatus};
pub use manual::ManualManager;
pub use pacing::{paced_demand, PacingInput};
pub use service::{ErrorHandler, SolverService};
pub use solver::{PollStatus, Solution, SolverClient, SubmitStatus};
pub use stats::{ManagerStats, Statistic, UseRate};
