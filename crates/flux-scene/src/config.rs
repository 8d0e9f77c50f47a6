//! Build configuration.

use flux_tessellate::TessellationParams;
use serde::{Deserialize, Serialize};

use crate::error::SceneError;

/// Options for one [`SceneBuilder`](crate::SceneBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SceneConfig {
    /// Coalesce compatible sibling geometry into shared buffers.
    pub merge_models: bool,
    /// Quality of generated solids and circles.
    pub tessellation: TessellationParams,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            merge_models: true,
            tessellation: TessellationParams::default(),
        }
    }
}

impl SceneConfig {
    /// Parse a possibly partial JSON configuration. Unknown keys are rejected.
    pub fn from_json(json: &str) -> Result<Self, SceneError> {
        serde_json::from_str(json).map_err(|e| SceneError::Config(e.to_string()))
    }

    /// Same configuration with merging switched on or off.
    pub fn with_merge_models(mut self, merge_models: bool) -> Self {
        self.merge_models = merge_models;
        self
    }
}
