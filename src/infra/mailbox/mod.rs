//! Result channel backends.

pub mod memory;

pub use memory::{Delivery, Received, ResultChannel};
