//! Infrastructure adapters for queues, result channels and solvers.

pub mod mailbox;
pub mod queue;
pub mod solver;

pub use mailbox::{Delivery, Received, ResultChannel};
pub use queue::{JobQueue, QueueError};
pub use solver::{DummyConfig, DummySolver};
