//! Tests for configuration validation

use std::time::Duration;

use solve_pacer::config::{FleetConfig, ManagerConfig, ServiceConfig};

#[test]
fn test_manager_config_defaults() {
    let cfg = ManagerConfig::default();
    assert_eq!(cfg.initial, 1);
    assert_eq!(cfg.maximum, 0);
    assert_eq!(cfg.limit, 0);
    assert_eq!(cfg.wait_slice(), Duration::from_secs(2));
    assert_eq!(cfg.stale_after(), Duration::from_secs(120));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_manager_config_invalid_initial() {
    assert!(ManagerConfig::default().with_initial(0).validate().is_err());
}

#[test]
fn test_manager_config_invalid_wait_slice() {
    assert!(ManagerConfig::default()
        .with_wait_slice(Duration::ZERO)
        .validate()
        .is_err());
}

#[test]
fn test_manager_config_from_json_fills_defaults() {
    let cfg = ManagerConfig::from_json_str(r#"{"initial": 4, "limit": 20}"#).unwrap();
    assert_eq!(cfg, ManagerConfig::default().with_initial(4).with_limit(20));

    assert!(ManagerConfig::from_json_str(r#"{"initial": 0}"#).is_err());
    assert!(ManagerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_service_config_defaults() {
    let cfg = ServiceConfig::default();
    assert_eq!(cfg.idle_sleep(), Duration::from_secs(3));
    assert_eq!(cfg.submit_interval(), Duration::from_secs(2));
    assert_eq!(cfg.poll_interval(), Duration::from_secs(6));
    assert_eq!(cfg.call_timeout(), Duration::from_secs(7));
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_service_config_poll_not_shorter_than_submit() {
    let cfg = ServiceConfig::default()
        .with_submit_interval(Duration::from_secs(5))
        .with_poll_interval(Duration::from_secs(1));
    assert!(cfg.validate().is_err());
}

#[test]
fn test_service_config_rejects_zero_pauses() {
    let zero = ServiceConfig::default()
        .with_idle_sleep(Duration::ZERO)
        .with_submit_interval(Duration::ZERO)
        .with_poll_interval(Duration::ZERO);
    assert!(zero.validate().is_err());

    let idle = ServiceConfig::default().with_idle_sleep(Duration::ZERO);
    assert_eq!(idle.validate().unwrap_err(), "idle_sleep_ms must be greater than 0");

    let submit = ServiceConfig::default().with_submit_interval(Duration::ZERO);
    assert_eq!(submit.validate().unwrap_err(), "submit_interval_ms must be greater than 0");

    assert!(ServiceConfig::from_json_str(r#"{"idle_sleep_ms": 0}"#).is_err());
}

#[test]
fn test_service_config_from_json() {
    let cfg = ServiceConfig::from_json_str(r#"{"poll_interval_ms": 9000}"#).unwrap();
    assert_eq!(cfg.poll_interval(), Duration::from_secs(9));
    assert_eq!(cfg.call_timeout(), Duration::from_secs(7));
}

#[test]
fn test_fleet_config_validation() {
    let json = r#"{
        "managers": {
            "login": {
                "target": {"url": "https://test.com/login", "site_key": "k",
                           "variant": {"type": "v2"}},
                "config": {"initial": 2}
            },
            "checkout": {
                "target": {"url": "https://test.com/pay", "site_key": "k",
                           "variant": {"type": "v3", "action": "pay", "min_score": 0.7}}
            }
        }
    }"#;
    let cfg = FleetConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.managers.len(), 2);
    assert_eq!(cfg.managers["login"].config.initial, 2);
    assert_eq!(cfg.managers["checkout"].config, ManagerConfig::default());
}

#[test]
fn test_fleet_config_rejects_empty_and_bad_targets() {
    assert!(FleetConfig::from_json_str(r#"{"managers": {}}"#).is_err());

    let json = r#"{"managers": {"bad": {"target": {
        "url": "test.com", "site_key": "k", "variant": {"type": "v2"}
    }}}}"#;
    let err = FleetConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("manager `bad` invalid"), "{err}");
}
