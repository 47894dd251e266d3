//! Builders for managers from configuration.

pub mod fleet_builder;

pub use fleet_builder::build_auto_managers;
