//! Configuration models for managers, fleets and the solver service.

pub mod manager;
pub mod service;

pub use manager::{FleetConfig, FleetEntry, ManagerConfig};
pub use service::ServiceConfig;
