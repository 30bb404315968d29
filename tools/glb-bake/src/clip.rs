//! Animation clips and the grouping of raw curve bindings
//!
//! Source clips store one curve per animated component, addressed by a path
//! below the clip root and a property name with a component suffix. They are
//! grouped here into one [`TargetCurveSet`] per path holding one
//! [`PropertyCurve`] per logical property.

use glam::Vec4;
use hashbrown::HashMap;
use serde::Deserialize;

use crate::curve::{component_slot, Curve, PropertyCurve};
use crate::error::{ExportReport, SkipReason};
use crate::scene::{NodeHandle, ObjectKind, ObjectRef, SceneLookup};
use crate::value::ValueType;

/// Collaborator-assigned clip identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ClipId(pub u32);

/// Property name blend shape weights are grouped under
pub const WEIGHTS_PROPERTY: &str = "weights";

const BLEND_SHAPE_PREFIX: &str = "blendShape.";
const MATERIAL_PREFIX: &str = "material.";

/// One animated component curve as the source clip stores it
#[derive(Debug, Clone, Deserialize)]
pub struct CurveBinding {
    /// Path of the animated node below the clip root; empty for the root
    #[serde(default)]
    pub path: String,
    /// The node at `path`, if it is part of the exported hierarchy
    #[serde(default)]
    pub node: Option<NodeHandle>,
    pub kind: ObjectKind,
    /// Property with component suffix, e.g. `m_LocalPosition.x` or `_Color.r`
    pub property: String,
    /// Declared type of the property; inferred from the suffixes when absent
    #[serde(default)]
    pub value_type: Option<ValueType>,
    pub curve: Curve,
}

/// All animated properties of one binding path
#[derive(Debug, Clone, PartialEq)]
pub struct TargetCurveSet {
    pub path: String,
    pub node: Option<NodeHandle>,
    pub properties: Vec<PropertyCurve>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub id: ClipId,
    pub name: String,
    /// Duration in seconds
    pub length: f32,
    pub bindings: Vec<TargetCurveSet>,
}

impl AnimationClip {
    pub fn new(id: ClipId, name: impl Into<String>, length: f32) -> Self {
        Self {
            id,
            name: name.into(),
            length,
            bindings: Vec::new(),
        }
    }

    pub fn with_binding(mut self, binding: TargetCurveSet) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Group raw curve bindings into per-path curve sets
    pub fn from_curves(
        id: ClipId,
        name: impl Into<String>,
        length: f32,
        curves: Vec<CurveBinding>,
        scene: &dyn SceneLookup,
        report: &mut ExportReport,
    ) -> Self {
        let mut clip = Self::new(id, name, length);
        clip.bindings = collect_bindings(&clip.name, length, curves, scene, report);
        clip
    }
}

/// Split `name.x` into `("name", Some(0))`
fn split_component(name: &str) -> (&str, Option<usize>) {
    match (component_slot(name), name.rsplit_once('.')) {
        (Some(slot), Some((base, _))) => (base, Some(slot)),
        _ => (name, None),
    }
}

fn is_color_suffix(name: &str) -> bool {
    matches!(name.rsplit_once('.'), Some((_, "r" | "g" | "b" | "a")))
}

fn is_euler_property(base: &str) -> bool {
    base.starts_with("localEuler")
}

/// Declared type of a node transform property, if it is one
fn transform_value_type(base: &str) -> Option<ValueType> {
    match base {
        "m_LocalPosition" | "m_LocalScale" => Some(ValueType::Vector3),
        "m_LocalRotation" => Some(ValueType::Quaternion),
        _ if is_euler_property(base) => Some(ValueType::Quaternion),
        _ => None,
    }
}

#[derive(Debug)]
struct PendingProperty {
    curve: PropertyCurve,
    declared: Option<ValueType>,
    max_slot: Option<usize>,
    color: bool,
}

/// Group curve bindings by path and property
pub fn collect_bindings(
    clip_name: &str,
    length: f32,
    curves: Vec<CurveBinding>,
    scene: &dyn SceneLookup,
    report: &mut ExportReport,
) -> Vec<TargetCurveSet> {
    let mut sets: Vec<(TargetCurveSet, Vec<PendingProperty>)> = Vec::new();
    let mut by_path: HashMap<String, usize> = HashMap::new();

    for binding in curves {
        let set_index = *by_path.entry(binding.path.clone()).or_insert_with(|| {
            sets.push((
                TargetCurveSet {
                    path: binding.path.clone(),
                    node: binding.node,
                    properties: Vec::new(),
                },
                Vec::new(),
            ));
            sets.len() - 1
        });

        let Some(node) = binding.node else {
            tracing::debug!("{}: no node at \"{}\"", clip_name, binding.path);
            continue;
        };

        let source = binding
            .property
            .strip_prefix(MATERIAL_PREFIX)
            .unwrap_or(&binding.property);
        let (kind, base, curve_name) = if source.starts_with(BLEND_SHAPE_PREFIX) {
            (ObjectKind::SkinnedMesh, WEIGHTS_PROPERTY, source)
        } else {
            (binding.kind, split_component(source).0, source)
        };

        let object = if kind == ObjectKind::Node {
            Some(ObjectRef::node(node))
        } else {
            scene.find_on_node(node, kind)
        };
        let Some(object) = object else {
            report.skip(
                format!("{}/{}/{}", clip_name, binding.path, binding.property),
                SkipReason::TargetNotExported,
            );
            continue;
        };

        let pending = &mut sets[set_index].1;
        let index = match pending
            .iter()
            .position(|p| p.curve.target == object && p.curve.property == base)
        {
            Some(index) => index,
            None => {
                let declared = binding.value_type.or_else(|| {
                    if base == WEIGHTS_PROPERTY {
                        Some(ValueType::Float)
                    } else if kind == ObjectKind::Node {
                        transform_value_type(base)
                    } else {
                        None
                    }
                });
                pending.push(PendingProperty {
                    curve: PropertyCurve::new(object, base, declared.unwrap_or(ValueType::Float)),
                    declared,
                    max_slot: None,
                    color: false,
                });
                pending.len() - 1
            }
        };

        let entry = &mut pending[index];
        let (_, slot) = split_component(curve_name);
        entry.max_slot = entry.max_slot.max(slot);
        entry.color |= is_color_suffix(curve_name);
        entry.curve.add_curve(curve_name, binding.curve);
    }

    sets.into_iter()
        .map(|(mut set, pending)| {
            set.properties = pending
                .into_iter()
                .map(|p| finish_property(p, length, scene))
                .collect();
            set
        })
        .collect()
}

/// Settle the value type and complete partially animated properties
fn finish_property(pending: PendingProperty, length: f32, scene: &dyn SceneLookup) -> PropertyCurve {
    let PendingProperty {
        mut curve,
        declared,
        max_slot,
        color,
    } = pending;

    curve.value_type = declared.unwrap_or(match (color, max_slot) {
        (true, _) => ValueType::Color,
        (false, None) => ValueType::Float,
        (false, Some(0 | 1)) => ValueType::Vector2,
        (false, Some(2)) => ValueType::Vector3,
        (false, Some(_)) => ValueType::Vector4,
    });

    if curve.property == WEIGHTS_PROPERTY {
        return order_blend_shapes(curve, length, scene);
    }

    let slots = match curve.value_type {
        ValueType::Float => 0,
        ValueType::Quaternion if is_euler_property(&curve.property) => 3,
        other => other.component_count(),
    };
    if slots > 0 && curve.len() < slots {
        if let Some(current) = scene.current_value(curve.target, &curve.property) {
            curve.fill_missing_components(current, slots, length);
        }
    }
    curve.sort_components();
    curve
}

/// Put weight curves in morph target order, holding unanimated shapes constant
fn order_blend_shapes(curve: PropertyCurve, length: f32, scene: &dyn SceneLookup) -> PropertyCurve {
    let Some(shapes) = scene.blend_shapes(curve.target) else {
        return curve;
    };

    let mut ordered = PropertyCurve::new(curve.target, WEIGHTS_PROPERTY, ValueType::Float);
    for shape in shapes {
        let name = format!("{}{}", BLEND_SHAPE_PREFIX, shape);
        let animated = curve
            .curve_names()
            .iter()
            .position(|n| *n == name)
            .map(|i| curve.curves()[i].clone());
        let source = animated.unwrap_or_else(|| {
            let current = scene
                .current_value(curve.target, &name)
                .unwrap_or(Vec4::ZERO);
            Curve::constant(current.x, length)
        });
        ordered.add_curve(name, source);
    }

    for name in curve.curve_names() {
        if !ordered.curve_names().contains(name) {
            tracing::debug!("blend shape curve \"{}\" has no morph target", name);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Keyframe;
    use crate::scene::SceneIndex;

    const ROOT: NodeHandle = NodeHandle(0);
    const ARM: NodeHandle = NodeHandle(1);
    const MATERIAL: ObjectRef = ObjectRef::new(ObjectKind::Material, 5);
    const MESH: ObjectRef = ObjectRef::new(ObjectKind::SkinnedMesh, 6);

    fn scene() -> SceneIndex {
        let mut scene = SceneIndex::new();
        scene
            .add_node(ROOT, Some(0))
            .add_node(ARM, Some(1))
            .attach(ROOT, MATERIAL, Some(0))
            .attach(ROOT, MESH, None)
            .set_blend_shapes(MESH, vec!["Smile".into(), "Blink".into(), "Frown".into()])
            .set_current_value(ObjectRef::node(ARM), "m_LocalPosition", Vec4::new(1.0, 2.0, 3.0, 0.0));
        scene
    }

    fn ramp() -> Curve {
        Curve::new(vec![Keyframe::linear(0.0, 0.0), Keyframe::linear(1.0, 1.0)])
    }

    fn binding(path: &str, node: Option<NodeHandle>, kind: ObjectKind, property: &str) -> CurveBinding {
        CurveBinding {
            path: path.to_string(),
            node,
            kind,
            property: property.to_string(),
            value_type: None,
            curve: ramp(),
        }
    }

    #[test]
    fn test_groups_components_by_path_and_property() {
        let scene = scene();
        let mut report = ExportReport::default();
        let curves = vec![
            binding("", Some(ROOT), ObjectKind::Node, "m_LocalScale.z"),
            binding("Arm", Some(ARM), ObjectKind::Node, "m_LocalRotation.w"),
            binding("", Some(ROOT), ObjectKind::Node, "m_LocalScale.x"),
            binding("", Some(ROOT), ObjectKind::Node, "m_LocalScale.y"),
            binding("Arm", Some(ARM), ObjectKind::Node, "m_LocalRotation.x"),
            binding("Arm", Some(ARM), ObjectKind::Node, "m_LocalRotation.y"),
            binding("Arm", Some(ARM), ObjectKind::Node, "m_LocalRotation.z"),
        ];
        let sets = collect_bindings("Clip", 1.0, curves, &scene, &mut report);

        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].path, "");
        let scale = &sets[0].properties[0];
        assert_eq!(scale.value_type, ValueType::Vector3);
        let names: Vec<&str> = scale.curve_names().iter().map(String::as_str).collect();
        assert_eq!(names, ["m_LocalScale.x", "m_LocalScale.y", "m_LocalScale.z"]);

        let rotation = &sets[1].properties[0];
        assert_eq!(rotation.value_type, ValueType::Quaternion);
        assert_eq!(rotation.len(), 4);
        assert!(rotation.curve_names()[3].ends_with(".w"));
        assert!(report.is_clean());
    }

    #[test]
    fn test_partial_translation_is_completed_from_current_value() {
        let scene = scene();
        let mut report = ExportReport::default();
        let curves = vec![binding("Arm", Some(ARM), ObjectKind::Node, "m_LocalPosition.y")];
        let sets = collect_bindings("Clip", 2.0, curves, &scene, &mut report);

        let position = &sets[0].properties[0];
        assert_eq!(position.len(), 3);
        assert!(position.validate().is_ok());
        assert_eq!(position.curves()[0].evaluate(1.0), 1.0);
        assert_eq!(position.curves()[2].evaluate(1.0), 3.0);
    }

    #[test]
    fn test_material_color_is_inferred() {
        let scene = scene();
        let mut report = ExportReport::default();
        let curves = ["r", "g", "b"]
            .iter()
            .map(|c| binding("", Some(ROOT), ObjectKind::Material, &format!("material._Color.{}", c)))
            .collect();
        let sets = collect_bindings("Clip", 1.0, curves, &scene, &mut report);

        let color = &sets[0].properties[0];
        assert_eq!(color.property, "_Color");
        assert_eq!(color.target, MATERIAL);
        assert_eq!(color.value_type, ValueType::Color);
    }

    #[test]
    fn test_blend_shapes_follow_morph_target_order() {
        let scene = scene();
        let mut report = ExportReport::default();
        let curves = vec![
            binding("", Some(ROOT), ObjectKind::SkinnedMesh, "blendShape.Frown"),
            binding("", Some(ROOT), ObjectKind::SkinnedMesh, "blendShape.Smile"),
        ];
        let sets = collect_bindings("Clip", 1.0, curves, &scene, &mut report);

        let weights = &sets[0].properties[0];
        assert_eq!(weights.property, WEIGHTS_PROPERTY);
        assert_eq!(weights.target, MESH);
        let names: Vec<&str> = weights.curve_names().iter().map(String::as_str).collect();
        assert_eq!(names, ["blendShape.Smile", "blendShape.Blink", "blendShape.Frown"]);
        // unanimated shape holds its weight
        assert_eq!(weights.curves()[1].evaluate(0.5), 0.0);
        assert_eq!(weights.curves()[0].evaluate(0.5), 0.5);
    }

    #[test]
    fn test_missing_objects_are_reported() {
        let scene = scene();
        let mut report = ExportReport::default();
        let curves = vec![
            binding("Gone", None, ObjectKind::Node, "m_LocalPosition.x"),
            binding("Arm", Some(ARM), ObjectKind::Light, "m_Intensity"),
        ];
        let sets = collect_bindings("Clip", 1.0, curves, &scene, &mut report);

        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].node, None);
        assert!(sets[0].properties.is_empty());
        assert!(sets[1].properties.is_empty());
        assert_eq!(report.count(&SkipReason::TargetNotExported), 1);
    }

    #[test]
    fn test_euler_rotation_keeps_three_curves() {
        let scene = scene();
        let mut report = ExportReport::default();
        let curves = ["x", "y", "z"]
            .iter()
            .map(|c| binding("", Some(ROOT), ObjectKind::Node, &format!("localEulerAnglesRaw.{}", c)))
            .collect();
        let sets = collect_bindings("Clip", 1.0, curves, &scene, &mut report);
        let rotation = &sets[0].properties[0];
        assert_eq!(rotation.value_type, ValueType::Quaternion);
        assert_eq!(rotation.len(), 3);
        assert!(rotation.validate().is_ok());
    }
}
