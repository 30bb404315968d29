//! glTF binary encoding and animation baking for asset exporters
//!
//! The crate owns the parts of an exporter that deal in bytes and samples:
//! - [`AccessorEncoder`]: typed arrays to aligned bufferViews and accessors,
//!   with component narrowing, bounds and sparse encoding
//! - [`bake_property`]: resampling keyframed curves at a fixed rate
//! - [`reduce_keyframes`]: dropping redundant baked samples
//! - [`PropertyRouter`]: mapping baked properties onto glTF channels
//! - [`AnimationMerger`]: reusing and merging clip exports
//!
//! Scene traversal stays with the caller, who answers questions through
//! [`SceneLookup`] and drives an [`ExportSession`].
//!
//! # Example
//!
//! ```no_run
//! use glb_bake::*;
//!
//! # fn main() -> glb_bake::Result<()> {
//! let scene = SceneIndex::new();
//! let mut session = ExportSession::new(ExportSettings::default(), PropertyTable::builtin()?, &scene);
//!
//! let triangle = PrimitiveBuilder::new()
//!     .positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1.0, 0.0]])
//!     .normals(&[[0.0, 0.0, 1.0]; 3])
//!     .indices(&[0, 1, 2]);
//! session.export_mesh("Triangle", &[triangle])?;
//!
//! let output = session.finish()?;
//! let glb_bytes = output.to_glb()?;
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod bake;
pub mod buffer;
pub mod clip;
pub mod convert;
pub mod curve;
pub mod document;
pub mod error;
pub mod mapping;
pub mod merge;
pub mod mesh;
pub mod pointer;
pub mod reduce;
pub mod router;
pub mod scene;
pub mod schema;
pub mod session;
pub mod settings;
pub mod value;

pub use accessor::{AccessorEncoder, AccessorIndex, BufferViewIndex, RawAccessor, SparseBase};
pub use bake::{bake_property, BakeOptions, BakedSample};
pub use buffer::{calculate_alignment, BufferWriter};
pub use clip::{AnimationClip, ClipId, CurveBinding, TargetCurveSet};
pub use curve::{Curve, Keyframe, PropertyCurve, TangentMode};
pub use document::{Document, Material, Node, Scene};
pub use error::{ExportError, ExportReport, Result, SkipReason, Warning};
pub use mapping::{PropertyRule, PropertyTable, Split, ValueTransform};
pub use merge::{AnimationMerger, AnimationSlot, ClipKey};
pub use mesh::{MorphTarget, PrimitiveBuilder};
pub use pointer::PointerBinding;
pub use reduce::{reduce_keyframe_blocks, reduce_keyframes};
pub use router::{ExportState, PropertyRouter};
pub use scene::{NodeHandle, ObjectKind, ObjectRef, SceneIndex, SceneLookup};
pub use session::{CancellationToken, ExportOutput, ExportSession};
pub use settings::ExportSettings;
pub use value::{PropertyValue, ValueType};
