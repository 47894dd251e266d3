//! Batch keys and the per-key registry kept by batch-keyed managers.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::descriptor::Variant;
use crate::core::{ConfigurationError, ManagerError, SolvedResult, TargetDescriptor};

/// Deterministic identity of a set of jobs with identical solving parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchKey(String);

impl BatchKey {
    /// Hex digest backing this key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the batch key for `target`.
///
/// Only the URL origin takes part unless `force_path` is set, in which case
/// the path does too. Query strings and fragments never do.
///
/// # Errors
///
/// Returns [`ManagerError::InvalidDescriptor`] if the descriptor does not validate.
pub fn batch_key(target: &TargetDescriptor, force_path: bool) -> Result<BatchKey, ManagerError> {
    target.validate()?;
    let url = target.parsed_url()?;
    let mut location = url.origin().ascii_serialization();
    if force_path {
        location.push_str(url.path());
    }

    let (action, min_score, invisible) = match &target.variant {
        Variant::V2 { invisible } => (String::new(), String::new(), *invisible),
        Variant::V3 { action, min_score } => (action.clone(), min_score.to_string(), false),
    };
    let canonical = format!(
        "{location}|{}|{}|{action}|{min_score}|{invisible}",
        target.site_key,
        target.variant.name()
    );

    Ok(BatchKey(hex::encode(Sha256::digest(canonical.as_bytes()))))
}

/// Shared outstanding count and buffers for one batch key.
#[derive(Debug, Default)]
pub struct BatchEntry {
    /// Jobs sent under this key that have not been consumed or discarded.
    pub outstanding: usize,
    /// Results waiting to be consumed.
    pub results: VecDeque<SolvedResult>,
    /// Terminal failures waiting to be reported.
    pub failures: VecDeque<ConfigurationError>,
}

impl BatchEntry {
    /// Jobs outstanding that have no buffered result yet.
    #[must_use]
    pub fn being_solved(&self) -> usize {
        self.outstanding.saturating_sub(self.results.len())
    }
}

/// All batches registered with a manager.
#[derive(Debug, Default)]
pub struct BatchRegistry {
    entries: HashMap<BatchKey, BatchEntry>,
}

impl BatchRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` outstanding jobs under `key`, creating the entry if needed.
    pub fn register(&mut self, key: &BatchKey, count: usize) {
        self.entries.entry(key.clone()).or_default().outstanding += count;
    }

    /// Whether `key` was ever registered.
    #[must_use]
    pub fn contains(&self, key: &BatchKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, key: &BatchKey) -> Option<&BatchEntry> {
        self.entries.get(key)
    }

    /// Look up an entry mutably.
    pub fn get_mut(&mut self, key: &BatchKey) -> Option<&mut BatchEntry> {
        self.entries.get_mut(key)
    }

    /// Buffer a result for `key`. Returns false if the key is unknown.
    pub fn deliver(&mut self, key: &BatchKey, result: SolvedResult) -> bool {
        self.entries.get_mut(key).is_some_and(|entry| {
            entry.results.push_back(result);
            true
        })
    }

    /// Buffer a terminal failure for `key`. The job's outstanding slot is
    /// released when the failure is reported.
    pub fn fail(&mut self, key: &BatchKey, error: ConfigurationError) -> bool {
        self.entries.get_mut(key).is_some_and(|entry| {
            entry.failures.push_back(error);
            true
        })
    }

    /// Release one outstanding slot without a result.
    pub fn release(&mut self, key: &BatchKey) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.outstanding = entry.outstanding.saturating_sub(1);
        }
    }

    /// Sum of outstanding jobs across every key.
    #[must_use]
    pub fn total_outstanding(&self) -> usize {
        self.entries.values().map(|e| e.outstanding).sum()
    }

    /// Buffered results for `key`, or across every key.
    #[must_use]
    pub fn available(&self, key: Option<&BatchKey>) -> usize {
        match key {
            Some(key) => self.entries.get(key).map_or(0, |e| e.results.len()),
            None => self.entries.values().map(|e| e.results.len()).sum(),
        }
    }

    /// Outstanding jobs without a buffered result for `key`, or across every key.
    #[must_use]
    pub fn being_solved(&self, key: Option<&BatchKey>) -> usize {
        match key {
            Some(key) => self.entries.get(key).map_or(0, BatchEntry::being_solved),
            None => self.entries.values().map(BatchEntry::being_solved).sum(),
        }
    }

    /// Drop every buffered result and failure, releasing their slots.
    /// Returns how many buffered items were discarded.
    pub fn clear_buffers(&mut self) -> usize {
        let mut cleared = 0;
        for entry in self.entries.values_mut() {
            let drained = entry.results.len() + entry.failures.len();
            entry.results.clear();
            entry.failures.clear();
            entry.outstanding = entry.outstanding.saturating_sub(drained);
            cleared += drained;
        }
        cleared
    }
}
