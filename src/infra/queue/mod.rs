//! Job queue backends.

pub mod memory;

pub use memory::{JobQueue, QueueError};
