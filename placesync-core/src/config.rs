//! Project configuration
//!
//! Defines the optional `placesync.json` manifest. Extraction options are
//! threaded through the projector as an explicit value; there is no
//! process-wide state.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The project configuration file (placesync.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Project name (used for display)
    #[serde(default = "default_name")]
    pub name: String,

    /// Classes to exclude from extraction (subtree included)
    #[serde(default)]
    pub exclude_classes: HashSet<String>,
}

fn default_name() -> String {
    "Place".to_string()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            exclude_classes: HashSet::new(),
        }
    }
}

impl ProjectConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ProjectConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}
