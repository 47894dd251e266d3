//! Solver service timing configuration.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Pauses and per-call timeout used by the solver service loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Pause when the job queue and awaiting list are both empty.
    pub idle_sleep_ms: u64,
    /// Pause between submit passes when nothing awaits an answer.
    pub submit_interval_ms: u64,
    /// Pause before each poll pass.
    pub poll_interval_ms: u64,
    /// Bound on a single submit or poll call.
    pub call_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            idle_sleep_ms: 3_000,
            submit_interval_ms: 2_000,
            poll_interval_ms: 6_000,
            call_timeout_ms: 7_000,
        }
    }
}

impl ServiceConfig {
    /// Set the idle pause.
    #[must_use]
    pub const fn with_idle_sleep(mut self, pause: Duration) -> Self {
        self.idle_sleep_ms = pause.as_millis() as u64;
        self
    }

    /// Set the pause between submit passes.
    #[must_use]
    pub const fn with_submit_interval(mut self, pause: Duration) -> Self {
        self.submit_interval_ms = pause.as_millis() as u64;
        self
    }

    /// Set the pause before poll passes.
    #[must_use]
    pub const fn with_poll_interval(mut self, pause: Duration) -> Self {
        self.poll_interval_ms = pause.as_millis() as u64;
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Idle pause as a duration.
    #[must_use]
    pub const fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }

    /// Submit pause as a duration.
    #[must_use]
    pub const fn submit_interval(&self) -> Duration {
        Duration::from_millis(self.submit_interval_ms)
    }

    /// Poll pause as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-call timeout as a duration.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Validate service configuration values.
    ///
    /// Every pause must be non-zero so the loop never spins against the
    /// solver; the poll pause must be at least the submit pause.
    pub fn validate(&self) -> Result<(), String> {
        if self.call_timeout_ms == 0 {
            return Err("call_timeout_ms must be greater than 0".into());
        }
        if self.idle_sleep_ms == 0 {
            return Err("idle_sleep_ms must be greater than 0".into());
        }
        if self.submit_interval_ms == 0 {
            return Err("submit_interval_ms must be greater than 0".into());
        }
        if self.poll_interval_ms < self.submit_interval_ms {
            return Err("poll_interval_ms must not be shorter than submit_interval_ms".into());
        }
        Ok(())
    }

    /// Parse service configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load overrides from the environment (and a `.env` file, if present).
    ///
    /// Reads `SOLVE_IDLE_SLEEP_MS`, `SOLVE_SUBMIT_INTERVAL_MS`,
    /// `SOLVE_POLL_INTERVAL_MS` and `SOLVE_CALL_TIMEOUT_MS`; unset variables
    /// keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails if a variable is not a valid integer or the result does not validate.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        let mut cfg = Self::default();
        for (var, field) in [
            ("SOLVE_IDLE_SLEEP_MS", &mut cfg.idle_sleep_ms),
            ("SOLVE_SUBMIT_INTERVAL_MS", &mut cfg.submit_interval_ms),
            ("SOLVE_POLL_INTERVAL_MS", &mut cfg.poll_interval_ms),
            ("SOLVE_CALL_TIMEOUT_MS", &mut cfg.call_timeout_ms),
        ] {
            if let Ok(raw) = std::env::var(var) {
                *field = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{var} must be an integer, got `{raw}`"))?;
            }
        }
        cfg.validate()
            .map_err(anyhow::Error::msg)
            .context("invalid service configuration from environment")?;
        Ok(cfg)
    }
}
