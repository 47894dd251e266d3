//! Manager and fleet configuration structures.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::TargetDescriptor;

const fn default_initial() -> u32 {
    1
}

const fn default_wait_slice_ms() -> u64 {
    2_000
}

const fn default_stale_after_secs() -> u64 {
    120
}

/// Per-manager pacing and retrieval settings.
///
/// `initial`, `maximum` and `limit` only drive self-pacing managers; batch-keyed
/// managers send exactly what callers ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Jobs sent per call while there is too little history to predict.
    #[serde(default = "default_initial")]
    pub initial: u32,
    /// Upper bound on jobs sent per call; 0 means none.
    #[serde(default)]
    pub maximum: u32,
    /// Upper bound on queued plus registered jobs; 0 means none.
    #[serde(default)]
    pub limit: u32,
    /// Length of one bounded wait inside `get_request`.
    #[serde(default = "default_wait_slice_ms")]
    pub wait_slice_ms: u64,
    /// Results solved longer ago than this are discarded as expired.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            initial: default_initial(),
            maximum: 0,
            limit: 0,
            wait_slice_ms: default_wait_slice_ms(),
            stale_after_secs: default_stale_after_secs(),
        }
    }
}

impl ManagerConfig {
    /// Set the cold-start batch size.
    #[must_use]
    pub const fn with_initial(mut self, initial: u32) -> Self {
        self.initial = initial;
        self
    }

    /// Set the per-call maximum.
    #[must_use]
    pub const fn with_maximum(mut self, maximum: u32) -> Self {
        self.maximum = maximum;
        self
    }

    /// Set the outstanding-work limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the wait slice.
    #[must_use]
    pub const fn with_wait_slice(mut self, slice: Duration) -> Self {
        self.wait_slice_ms = slice.as_millis() as u64;
        self
    }

    /// Set the staleness threshold.
    #[must_use]
    pub const fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after_secs = stale_after.as_secs();
        self
    }

    /// Wait slice as a duration.
    #[must_use]
    pub const fn wait_slice(&self) -> Duration {
        Duration::from_millis(self.wait_slice_ms)
    }

    /// Staleness threshold as a duration.
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Validate manager configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.initial == 0 {
            return Err("initial must be greater than 0".into());
        }
        if self.wait_slice_ms == 0 {
            return Err("wait_slice_ms must be greater than 0".into());
        }
        if self.stale_after_secs == 0 {
            return Err("stale_after_secs must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse manager configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// One self-pacing manager in a fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetEntry {
    /// What the manager's jobs solve.
    pub target: TargetDescriptor,
    /// Pacing settings.
    #[serde(default)]
    pub config: ManagerConfig,
}

/// Named self-pacing managers sharing one job queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Map of manager name to its target and settings.
    pub managers: HashMap<String, FleetEntry>,
}

impl FleetConfig {
    /// Validate all managers and ensure at least one exists.
    pub fn validate(&self) -> Result<(), String> {
        if self.managers.is_empty() {
            return Err("at least one manager must be defined".into());
        }
        for (name, entry) in &self.managers {
            entry
                .target
                .validate()
                .map_err(|e| format!("manager `{name}` invalid: {e}"))?;
            entry
                .config
                .validate()
                .map_err(|e| format!("manager `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse fleet configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
