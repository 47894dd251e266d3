//! Tests for error types

use std::time::Duration;

use solve_pacer::core::{
    batch_key, ConfigurationError, ManagerError, ServiceError, SolverError, TargetDescriptor,
};
use solve_pacer::infra::QueueError;

#[test]
fn test_configuration_error_messages() {
    assert_eq!(ConfigurationError::BadDomain.to_string(), "provided domain is incorrect");
    assert_eq!(ConfigurationError::NoBalance.to_string(), "balance insufficient");
}

#[test]
fn test_solver_error_is_transparent_for_configuration() {
    let err = SolverError::from(ConfigurationError::BadCredential);
    assert_eq!(err.to_string(), "API key provided is incorrect");
}

#[test]
fn test_timeout_messages() {
    let err = ManagerError::TimedOut(Duration::from_secs(3));
    assert_eq!(err.to_string(), "timed out after 3s waiting for a result");

    let err = SolverError::Timeout(Duration::from_millis(7000));
    assert_eq!(err.to_string(), "solver call timed out after 7s");
}

#[test]
fn test_batch_errors_name_the_key() {
    let key = batch_key(&TargetDescriptor::v2("https://test.com", "k", false), false).unwrap();
    let err = ManagerError::UnknownBatch(key.clone());
    assert_eq!(err.to_string(), format!("unknown batch key: {key}"));
}

#[test]
fn test_conversions() {
    assert_eq!(
        ManagerError::from(ConfigurationError::LowBid),
        ManagerError::Rejected(ConfigurationError::LowBid)
    );
    assert_eq!(
        ManagerError::from(QueueError::Closed).to_string(),
        "job queue closed"
    );
    assert_eq!(
        ServiceError::from(SolverError::Transient("reset".into())).to_string(),
        "solver service stopped: transient solver error: reset"
    );
}
