//! Builders to construct self-pacing managers from configuration.

use std::collections::HashMap;

use crate::config::FleetConfig;
use crate::core::{AutoManager, ManagerError};
use crate::infra::JobQueue;

/// Build one [`AutoManager`] per fleet entry, all feeding `queue`.
/// Each manager is named after its entry.
///
/// # Errors
///
/// Returns [`ManagerError::InvalidArgument`] if the configuration does not
/// validate.
pub fn build_auto_managers(
    cfg: &FleetConfig,
    queue: &JobQueue,
) -> Result<HashMap<String, AutoManager>, ManagerError> {
    cfg.validate()
        .map_err(|e| ManagerError::InvalidArgument(format!("config invalid: {e}")))?;

    let mut managers = HashMap::with_capacity(cfg.managers.len());
    for (name, entry) in &cfg.managers {
        let manager = AutoManager::create_named(
            queue,
            name.clone(),
            entry.target.clone(),
            entry.config.clone(),
        )?;
        managers.insert(name.clone(), manager);
    }

    tracing::info!(count = managers.len(), "auto managers built");
    Ok(managers)
}
