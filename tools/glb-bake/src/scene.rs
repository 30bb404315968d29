//! Scene identities and the lookup seam to the scene-graph exporter
//!
//! The core never traverses a scene. Collaborators assign stable handles to
//! every animatable object and answer the questions in [`SceneLookup`].

use glam::Vec4;
use hashbrown::{HashMap, HashSet};
use serde::Deserialize;

/// Kind of object an animated property lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Node,
    Material,
    Light,
    PerspectiveCamera,
    OrthographicCamera,
    SkinnedMesh,
    /// Any other component attached to a node
    Component,
}

impl ObjectKind {
    pub fn is_camera(self) -> bool {
        matches!(
            self,
            ObjectKind::PerspectiveCamera | ObjectKind::OrthographicCamera
        )
    }
}

/// Collaborator-assigned node identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct NodeHandle(pub u32);

/// Collaborator-assigned identity of any animatable object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub handle: u32,
}

impl ObjectRef {
    pub const fn new(kind: ObjectKind, handle: u32) -> Self {
        Self { kind, handle }
    }

    pub const fn node(node: NodeHandle) -> Self {
        Self::new(ObjectKind::Node, node.0)
    }
}

/// Questions the animation pipeline asks about the exported scene
pub trait SceneLookup {
    /// Index the object was exported under
    ///
    /// Nodes, components and skinned meshes report their node's index,
    /// materials their material index, lights and cameras their own list index.
    fn index_of(&self, object: ObjectRef) -> Option<u32>;

    /// Node the object is attached to; nodes own themselves
    fn owner_node(&self, object: ObjectRef) -> Option<NodeHandle>;

    /// First object of `kind` attached to `node`
    fn find_on_node(&self, node: NodeHandle, kind: ObjectKind) -> Option<ObjectRef>;

    /// Whether the node is active in the source scene
    fn is_active(&self, node: NodeHandle) -> bool;

    /// Whether a material has a texture bound in `slot`
    fn has_texture(&self, material: ObjectRef, slot: &str) -> bool;

    /// Whether the node's forward axis is inverted on export (lights, cameras)
    fn flips_look_direction(&self, node: NodeHandle) -> bool;

    /// Largest blend shape frame weight of a skinned mesh, if known
    fn blend_shape_weight_range(&self, _object: ObjectRef) -> Option<f32> {
        None
    }

    /// Blend shape names of a skinned mesh in morph target order
    fn blend_shapes(&self, _object: ObjectRef) -> Option<&[String]> {
        None
    }

    /// Present value of an animatable property, components in x/y/z/w order
    ///
    /// Used to complete properties whose clip animates only some components.
    fn current_value(&self, _object: ObjectRef, _property: &str) -> Option<Vec4> {
        None
    }

    /// glTF node index of the node owning `object`
    fn node_index_of(&self, object: ObjectRef) -> Option<u32> {
        let node = self.owner_node(object)?;
        self.index_of(ObjectRef::node(node))
    }
}

#[derive(Debug, Clone, Default)]
struct NodeEntry {
    index: Option<u32>,
    active: bool,
    attached: Vec<ObjectRef>,
}

/// Map-backed [`SceneLookup`] for collaborators without their own index
#[derive(Debug, Clone, Default)]
pub struct SceneIndex {
    nodes: HashMap<NodeHandle, NodeEntry>,
    objects: HashMap<ObjectRef, (NodeHandle, Option<u32>)>,
    textures: HashSet<(ObjectRef, String)>,
    blend_shape_ranges: HashMap<ObjectRef, f32>,
    blend_shapes: HashMap<ObjectRef, Vec<String>>,
    values: HashMap<(ObjectRef, String), Vec4>,
}

impl SceneIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node; `index` is `None` when it was not exported
    pub fn add_node(&mut self, node: NodeHandle, index: Option<u32>) -> &mut Self {
        let entry = self.nodes.entry(node).or_default();
        entry.index = index;
        entry.active = true;
        self
    }

    pub fn set_active(&mut self, node: NodeHandle, active: bool) -> &mut Self {
        self.nodes.entry(node).or_default().active = active;
        self
    }

    /// Attach a non-node object to a node
    pub fn attach(&mut self, node: NodeHandle, object: ObjectRef, index: Option<u32>) -> &mut Self {
        self.nodes.entry(node).or_default().attached.push(object);
        self.objects.insert(object, (node, index));
        self
    }

    pub fn add_texture(&mut self, material: ObjectRef, slot: &str) -> &mut Self {
        self.textures.insert((material, slot.to_string()));
        self
    }

    pub fn set_blend_shape_weight_range(&mut self, mesh: ObjectRef, max_weight: f32) -> &mut Self {
        self.blend_shape_ranges.insert(mesh, max_weight);
        self
    }

    pub fn set_blend_shapes(&mut self, mesh: ObjectRef, names: Vec<String>) -> &mut Self {
        self.blend_shapes.insert(mesh, names);
        self
    }

    pub fn set_current_value(&mut self, object: ObjectRef, property: &str, value: Vec4) -> &mut Self {
        self.values.insert((object, property.to_string()), value);
        self
    }
}

impl SceneLookup for SceneIndex {
    fn index_of(&self, object: ObjectRef) -> Option<u32> {
        match object.kind {
            ObjectKind::Node => self.nodes.get(&NodeHandle(object.handle))?.index,
            ObjectKind::Component | ObjectKind::SkinnedMesh => {
                let (node, _) = self.objects.get(&object)?;
                self.nodes.get(node)?.index
            }
            _ => self.objects.get(&object)?.1,
        }
    }

    fn owner_node(&self, object: ObjectRef) -> Option<NodeHandle> {
        match object.kind {
            ObjectKind::Node => Some(NodeHandle(object.handle)),
            _ => self.objects.get(&object).map(|(node, _)| *node),
        }
    }

    fn find_on_node(&self, node: NodeHandle, kind: ObjectKind) -> Option<ObjectRef> {
        if kind == ObjectKind::Node {
            return self.nodes.contains_key(&node).then_some(ObjectRef::node(node));
        }
        self.nodes
            .get(&node)?
            .attached
            .iter()
            .find(|o| o.kind == kind)
            .copied()
    }

    fn is_active(&self, node: NodeHandle) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.active)
    }

    fn has_texture(&self, material: ObjectRef, slot: &str) -> bool {
        self.textures.contains(&(material, slot.to_string()))
    }

    fn flips_look_direction(&self, node: NodeHandle) -> bool {
        self.nodes.get(&node).is_some_and(|n| {
            n.attached
                .iter()
                .any(|o| o.kind == ObjectKind::Light || o.kind.is_camera())
        })
    }

    fn blend_shape_weight_range(&self, object: ObjectRef) -> Option<f32> {
        self.blend_shape_ranges.get(&object).copied()
    }

    fn blend_shapes(&self, object: ObjectRef) -> Option<&[String]> {
        self.blend_shapes.get(&object).map(Vec::as_slice)
    }

    fn current_value(&self, object: ObjectRef, property: &str) -> Option<Vec4> {
        self.values.get(&(object, property.to_string())).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scene() -> SceneIndex {
        let mut scene = SceneIndex::new();
        scene
            .add_node(NodeHandle(1), Some(0))
            .add_node(NodeHandle(2), Some(1))
            .add_node(NodeHandle(3), None)
            .attach(NodeHandle(2), ObjectRef::new(ObjectKind::Light, 10), Some(0))
            .attach(NodeHandle(1), ObjectRef::new(ObjectKind::Material, 20), Some(3))
            .attach(NodeHandle(1), ObjectRef::new(ObjectKind::SkinnedMesh, 30), None)
            .add_texture(ObjectRef::new(ObjectKind::Material, 20), "baseColorTexture");
        scene
    }

    #[test]
    fn test_index_of_by_kind() {
        let scene = sample_scene();
        assert_eq!(scene.index_of(ObjectRef::node(NodeHandle(2))), Some(1));
        assert_eq!(scene.index_of(ObjectRef::node(NodeHandle(3))), None);
        assert_eq!(scene.index_of(ObjectRef::new(ObjectKind::Light, 10)), Some(0));
        assert_eq!(scene.index_of(ObjectRef::new(ObjectKind::Material, 20)), Some(3));
        // skinned meshes resolve to their node
        assert_eq!(scene.index_of(ObjectRef::new(ObjectKind::SkinnedMesh, 30)), Some(0));
        assert_eq!(
            scene.node_index_of(ObjectRef::new(ObjectKind::Light, 10)),
            Some(1)
        );
    }

    #[test]
    fn test_find_on_node_and_flags() {
        let scene = sample_scene();
        assert_eq!(
            scene.find_on_node(NodeHandle(1), ObjectKind::Material),
            Some(ObjectRef::new(ObjectKind::Material, 20))
        );
        assert_eq!(scene.find_on_node(NodeHandle(2), ObjectKind::Material), None);
        assert!(scene.flips_look_direction(NodeHandle(2)));
        assert!(!scene.flips_look_direction(NodeHandle(1)));
        assert!(scene.has_texture(ObjectRef::new(ObjectKind::Material, 20), "baseColorTexture"));
        assert!(!scene.has_texture(ObjectRef::new(ObjectKind::Material, 20), "emissiveTexture"));
    }
}
