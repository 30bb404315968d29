//! Property mapping table: source property names to glTF channel paths
//!
//! The table is plain data. Each rule names the object kind and source
//! property names it applies to, the output path, an optional split into a
//! second channel, and the per-sample transform. A built-in table covering
//! materials, lights, cameras, nodes and skinned meshes is embedded from
//! `mappings/builtin.toml`.

use std::path::Path;

use hashbrown::HashMap;
use serde::Deserialize;

use crate::error::{ExportError, Result};
use crate::scene::ObjectKind;

const BUILTIN_TABLE: &str = include_str!("../mappings/builtin.toml");

/// How one baked property is split over two output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Split {
    /// Packed `scale.xy, offset.zw` to two VEC2 channels
    ScaleOffset,
    /// HDR color to a clamped color and a strength scalar, emitted only above 1
    EmissiveStrength,
    /// The same output written to both paths
    Mirror,
}

/// Per-sample transform applied before encoding
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValueTransform {
    /// Replace `x` with `1 - x` (smoothness to roughness)
    pub flip_range: bool,
    pub multiplier: Option<f32>,
    /// Convert sRGB color components to linear
    pub linear_color: bool,
    /// Write colors as VEC4; otherwise alpha is dropped
    pub keep_alpha: bool,
    /// Mirror positions and rotations across the X axis
    pub switch_handedness: bool,
    /// Scale blend shape weights by the mesh's frame weight range
    pub normalize_blend_weights: bool,
}

impl Default for ValueTransform {
    fn default() -> Self {
        Self {
            flip_range: false,
            multiplier: None,
            linear_color: false,
            keep_alpha: true,
            switch_handedness: false,
            normalize_blend_weights: false,
        }
    }
}

/// One row of the mapping table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropertyRule {
    pub kind: ObjectKind,
    pub names: Vec<String>,
    /// Channel path relative to the animated object
    pub path: String,
    #[serde(default)]
    pub second_path: Option<String>,
    #[serde(default)]
    pub split: Option<Split>,
    #[serde(default)]
    pub transform: ValueTransform,
    /// glTF extension the path lives in
    #[serde(default)]
    pub extension: Option<String>,
    /// Material texture slot that must be bound for the animation to matter
    #[serde(default)]
    pub texture: Option<String>,
    /// Path is a core channel path (`translation`, `rotation`, `scale`, `weights`)
    #[serde(default)]
    pub native: bool,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    #[serde(default, rename = "rule")]
    rules: Vec<PropertyRule>,
}

/// Lookup table from `(kind, property name)` to a [`PropertyRule`]
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    rules: Vec<PropertyRule>,
    index: HashMap<(ObjectKind, String), usize>,
}

impl PropertyTable {
    pub fn new(rules: Vec<PropertyRule>) -> Self {
        let mut index = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            for name in &rule.names {
                // first rule wins on duplicate names
                index.entry((rule.kind, name.clone())).or_insert(i);
            }
        }
        Self { rules, index }
    }

    /// Parse a table from TOML `[[rule]]` entries
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: TableFile = toml::from_str(source)?;
        Ok(Self::new(file.rules))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// The embedded default table
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TABLE)
    }

    pub fn get(&self, kind: ObjectKind, property: &str) -> Option<&PropertyRule> {
        self.index
            .get(&(kind, property.to_string()))
            .map(|&i| &self.rules[i])
    }

    pub fn rules(&self) -> &[PropertyRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
