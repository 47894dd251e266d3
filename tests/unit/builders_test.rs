//! Tests for builder modules

use std::collections::HashMap;

use solve_pacer::builders::build_auto_managers;
use solve_pacer::config::{FleetConfig, FleetEntry, ManagerConfig};
use solve_pacer::core::{Manager, ManagerError, TargetDescriptor};
use solve_pacer::infra::JobQueue;

fn entry(url: &str, initial: u32) -> FleetEntry {
    FleetEntry {
        target: TargetDescriptor::v2(url, "site-key", false),
        config: ManagerConfig::default().with_initial(initial),
    }
}

#[test]
fn test_build_auto_managers_share_the_queue() {
    let mut managers = HashMap::new();
    managers.insert("a".to_string(), entry("https://a.com", 2));
    managers.insert("b".to_string(), entry("https://b.com", 3));
    let queue = JobQueue::new();

    let built = build_auto_managers(&FleetConfig { managers }, &queue).unwrap();
    assert_eq!(built.len(), 2);
    assert_eq!(built["a"].id(), "a");
    assert_eq!(built["b"].target().url, "https://b.com");

    built["a"].send_request(None, None).unwrap();
    built["b"].send_request(None, None).unwrap();
    assert_eq!(queue.len(), 5);
}

#[test]
fn test_build_auto_managers_rejects_invalid_config() {
    let queue = JobQueue::new();
    let err = build_auto_managers(&FleetConfig { managers: HashMap::new() }, &queue).unwrap_err();
    assert!(matches!(err, ManagerError::InvalidArgument(_)));
}
