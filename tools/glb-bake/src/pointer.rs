//! Symbolic KHR_animation_pointer bindings
//!
//! Pointer channels are emitted before every object has its final glTF index,
//! so they carry an object handle plus a relative path and are turned into
//! JSON pointers when the session finishes.

use crate::scene::{NodeHandle, ObjectKind, ObjectRef, SceneLookup};

pub const ANIMATION_POINTER_EXTENSION: &str = "KHR_animation_pointer";

/// An animated path on a not yet indexed object
#[derive(Debug, Clone, PartialEq)]
pub struct PointerBinding {
    pub object: ObjectRef,
    /// Path below the object, e.g. `pbrMetallicRoughness/baseColorFactor`
    pub property: String,
}

impl PointerBinding {
    pub fn new(object: ObjectRef, property: impl Into<String>) -> Self {
        Self {
            object,
            property: property.into(),
        }
    }

    /// JSON pointer for the binding, if its object was exported
    pub fn resolve(&self, scene: &dyn SceneLookup) -> Option<String> {
        let index = scene.index_of(self.object)?;
        let prefix = match self.object.kind {
            ObjectKind::Light => "/extensions/KHR_lights_punctual/lights",
            ObjectKind::PerspectiveCamera | ObjectKind::OrthographicCamera => "/cameras",
            ObjectKind::Material => "/materials",
            ObjectKind::Node | ObjectKind::SkinnedMesh | ObjectKind::Component => "/nodes",
        };
        Some(format!("{}/{}/{}", prefix, index, self.property))
    }

    /// The same binding on the equivalent object of another node
    pub fn retarget(&self, node: NodeHandle, scene: &dyn SceneLookup) -> Option<PointerBinding> {
        let object = scene.find_on_node(node, self.object.kind)?;
        Some(PointerBinding {
            object,
            property: self.property.clone(),
        })
    }
}
