//! Clock and telemetry helpers.

pub mod clock;
pub mod telemetry;

pub use clock::*;
pub use telemetry::*;
