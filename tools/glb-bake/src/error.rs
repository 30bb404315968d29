//! Error types for encoding and baking
//!
//! Two classes of failure exist. [`ExportError`] aborts the entity being
//! exported and is returned to the caller. [`SkipReason`] drops a single
//! animated property; it is logged and collected into an [`ExportReport`]
//! while the export carries on.

use std::path::PathBuf;

use crate::scene::ObjectKind;
use crate::value::ValueType;

/// Result alias used throughout the crate
pub type Result<T, E = ExportError> = std::result::Result<T, E>;

/// Hard failures that stop the current mesh, clip or session
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// An encoder was handed a zero-length array
    #[error("cannot encode an empty {0} accessor")]
    EmptyAccessor(&'static str),

    /// Sparse overlay and base data differ in length
    #[error("sparse overlay has {overlay} elements but its base has {base}")]
    SparseLengthMismatch { base: usize, overlay: usize },

    /// A base accessor handle does not belong to this session
    #[error("accessor {0} does not exist in this session")]
    UnknownAccessor(u32),

    /// Offsets and lengths are stored as u32 in glTF
    #[error("binary buffer grew past 4 GiB ({0} bytes)")]
    BufferTooLarge(usize),

    /// The host requested cancellation between two steps
    #[error("export cancelled")]
    Cancelled,

    /// Settings or property table could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// glTF JSON could not be serialized
    #[error("failed to serialize glTF JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration file could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Wraps a failure with the mesh that caused it
    #[error("mesh \"{name}\": {source}")]
    Mesh {
        name: String,
        #[source]
        source: Box<ExportError>,
    },

    /// Wraps a failure with the clip that caused it
    #[error("clip \"{name}\": {source}")]
    Clip {
        name: String,
        #[source]
        source: Box<ExportError>,
    },
}

impl ExportError {
    pub fn in_mesh(self, name: &str) -> Self {
        ExportError::Mesh {
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    pub fn in_clip(self, name: &str) -> Self {
        ExportError::Clip {
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

/// Why a single animated property was dropped
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("property has no curves")]
    NoCurves,

    #[error("expected {expected} curves for a {value_type:?} property, found {found}")]
    ComponentCount {
        value_type: ValueType,
        expected: usize,
        found: usize,
    },

    /// Colors must animate at least r, g and b
    #[error("color is missing its .{0} channel")]
    MissingColorChannel(char),

    #[error("blend shape weight samples have different lengths")]
    RaggedWeights,

    #[error("no mapping for property \"{property}\" on {kind:?}")]
    UnknownProperty { kind: ObjectKind, property: String },

    #[error("baked {found:?} values do not fit the \"{path}\" channel")]
    ValueMismatch { path: String, found: ValueType },

    #[error("texture slot \"{0}\" has no texture")]
    MissingTexture(String),

    #[error("animated object is not exported")]
    TargetNotExported,

    #[error("property needs KHR_animation_pointer, which is disabled")]
    PointerDisabled,

    #[error("pointer target could not be resolved")]
    UnresolvedPointer,
}

/// A skipped property and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub context: String,
    pub reason: SkipReason,
}

/// Skippable problems collected over one export session
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub warnings: Vec<Warning>,
}

impl ExportReport {
    /// Record a skipped property and log it
    pub fn skip(&mut self, context: impl Into<String>, reason: SkipReason) {
        let context = context.into();
        tracing::warn!("skipping {}: {}", context, reason);
        self.warnings.push(Warning { context, reason });
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of warnings with the given reason
    pub fn count(&self, reason: &SkipReason) -> usize {
        self.warnings.iter().filter(|w| &w.reason == reason).count()
    }
}
