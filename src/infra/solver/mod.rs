//! Solver implementations.

pub mod dummy;

pub use dummy::{DummyConfig, DummySolver};
