//! CLI commands

pub mod check;
pub mod dispatch;
pub mod list;

use anyhow::Context;
use hookgate_core::settings::{ConfigStore, SettingsLocations};
use std::path::Path;

/// Config store for the given project directory, or the current one
pub fn config_store(project_dir: Option<&Path>) -> anyhow::Result<ConfigStore> {
    let locations = match project_dir {
        Some(dir) => {
            let dir = dir
                .canonicalize()
                .with_context(|| format!("Project directory not found: {}", dir.display()))?;
            SettingsLocations::discover_from(dir)
        }
        None => SettingsLocations::discover(),
    };
    Ok(ConfigStore::with_locations(&locations))
}
