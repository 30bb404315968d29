//! Export settings
//!
//! Loaded from TOML; every field is optional.

use std::path::Path;

use serde::Deserialize;

use crate::bake::DEFAULT_SAMPLE_RATE;
use crate::error::{ExportError, Result};

/// Session-wide export options
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportSettings {
    /// Baking rate in samples per second.
    /// Default: 30
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,

    /// Scale sample times by the clip's playback speed.
    /// Default: true
    #[serde(default = "default_true")]
    pub bake_animation_speed: bool,

    /// Splice clips with the same name into one animation.
    /// Default: false
    #[serde(default)]
    pub merge_clips_with_matching_names: bool,

    /// Suffix duplicate animation names with " (1)", " (2)", ...
    /// Default: false
    #[serde(default)]
    pub unique_animation_names: bool,

    /// Route every channel through KHR_animation_pointer.
    /// When false, properties without a core channel path are skipped.
    /// Default: false
    #[serde(default)]
    pub use_animation_pointer: bool,

    /// Treat inactive nodes as valid animation targets.
    /// Default: false
    #[serde(default)]
    pub export_disabled_nodes: bool,

    /// Drop redundant interior keyframes after baking.
    /// Default: true
    #[serde(default = "default_true")]
    pub reduce_keyframes: bool,
}

fn default_frame_rate() -> f32 {
    DEFAULT_SAMPLE_RATE
}

fn default_true() -> bool {
    true
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            bake_animation_speed: true,
            merge_clips_with_matching_names: false,
            unique_animation_names: false,
            use_animation_pointer: false,
            export_disabled_nodes: false,
            reduce_keyframes: true,
        }
    }
}

impl ExportSettings {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Playback speed the baker should apply
    pub fn effective_speed(&self, speed: f32) -> f32 {
        if self.bake_animation_speed { speed } else { 1.0 }
    }
}
