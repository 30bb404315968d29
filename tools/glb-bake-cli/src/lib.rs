//! glb-bake CLI library
//!
//! Reads JSON scene descriptions and drives a [`glb_bake::ExportSession`]
//! over them. Used by the `glb-bake` binary and its tests.

pub mod description;
pub mod export;

pub use description::SceneDescription;
pub use export::{export_file, export_scene, ExportedScene};
