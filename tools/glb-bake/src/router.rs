//! Routing of baked properties onto animation channels
//!
//! A baked property is looked up in the [`PropertyTable`], transformed per
//! sample, optionally split over a second channel and encoded. Channels either
//! target a node directly or carry a [`PointerBinding`] resolved when the
//! session finishes.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::accessor::{AccessorEncoder, AccessorIndex};
use crate::bake::BakedSample;
use crate::convert::{
    color_to_linear, convert_rotation, decompose_emission, decompose_scale_offset,
    switch_handedness_vec3,
};
use crate::curve::PropertyCurve;
use crate::error::{ExportReport, Result, SkipReason};
use crate::mapping::{PropertyRule, PropertyTable, Split, ValueTransform};
use crate::pointer::{PointerBinding, ANIMATION_POINTER_EXTENSION};
use crate::reduce::{reduce_keyframe_blocks, reduce_keyframes};
use crate::scene::{ObjectKind, ObjectRef, SceneLookup};
use crate::schema::{
    Animation, AnimationSampler, Channel, ChannelTarget, ChannelTargetExtensions, Interpolation,
    PointerExtension,
};
use crate::value::PropertyValue;

/// Path of every pointer channel target
pub const POINTER_PATH: &str = "pointer";

/// Buffer and bookkeeping shared by every routed property of a session
#[derive(Debug, Default)]
pub struct ExportState {
    pub encoder: AccessorEncoder,
    pub extensions_used: BTreeSet<String>,
    /// Extensions each animated material must declare
    pub material_extensions: HashMap<ObjectRef, BTreeSet<String>>,
    pub report: ExportReport,
}

impl ExportState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_extension(&mut self, target: ObjectRef, extension: &str) {
        self.extensions_used.insert(extension.to_string());
        if target.kind == ObjectKind::Material {
            self.material_extensions
                .entry(target)
                .or_default()
                .insert(extension.to_string());
        }
    }
}

/// Where a property's channels point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelBinding {
    Node(u32),
    Pointer,
}

/// Transformed values ready to encode
#[derive(Debug, Clone, PartialEq)]
enum Output {
    Scalars(Vec<f32>),
    Vec2(Vec<[f32; 2]>),
    Vec3(Vec<[f32; 3]>),
    Vec4(Vec<[f32; 4]>),
}

impl Output {
    fn encode(&self, encoder: &mut AccessorEncoder) -> Result<AccessorIndex> {
        match self {
            Output::Scalars(values) => encoder.pack_floats(values),
            Output::Vec2(values) => encoder.pack_vec2(values),
            Output::Vec3(values) => encoder.pack_vec3(values),
            Output::Vec4(values) => encoder.pack_vec4(values),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SecondChannel {
    None,
    /// Same output accessor under the second path
    Shared,
    Own(Output),
}

#[derive(Debug)]
struct Prepared {
    times: Vec<f32>,
    primary: Output,
    second: SecondChannel,
}

/// Maps baked properties to channels and samplers
pub struct PropertyRouter<'a> {
    table: &'a PropertyTable,
    scene: &'a dyn SceneLookup,
    use_animation_pointer: bool,
    reduce_keyframes: bool,
}

impl<'a> PropertyRouter<'a> {
    pub fn new(table: &'a PropertyTable, scene: &'a dyn SceneLookup) -> Self {
        Self {
            table,
            scene,
            use_animation_pointer: false,
            reduce_keyframes: true,
        }
    }

    pub fn with_animation_pointer(mut self, enabled: bool) -> Self {
        self.use_animation_pointer = enabled;
        self
    }

    pub fn with_keyframe_reduction(mut self, enabled: bool) -> Self {
        self.reduce_keyframes = enabled;
        self
    }

    /// Emit the channels of one baked property into `animation`
    ///
    /// Skippable problems are recorded in the state's report under `context`
    /// and yield zero channels. Returns the number of channels added.
    pub fn route(
        &self,
        state: &mut ExportState,
        animation: &mut Animation,
        context: &str,
        property: &PropertyCurve,
        baked: BakedSample,
    ) -> Result<usize> {
        let prepared = self.resolve(property).and_then(|(rule, binding)| {
            let prepared = self.prepare(rule, property.target, baked)?;
            Ok((rule, binding, prepared))
        });
        let (rule, binding, prepared) = match prepared {
            Ok(routed) => routed,
            Err(reason) => {
                state.report.skip(context, reason);
                return Ok(0);
            }
        };

        let target = property.target;
        let input = state.encoder.pack_floats(&prepared.times)?;
        let output = prepared.primary.encode(&mut state.encoder)?;
        push_channel(animation, binding, target, &rule.path, input, output);
        let mut emitted = 1;

        let second = match (&prepared.second, &rule.second_path) {
            (SecondChannel::None, _) => None,
            (_, None) => {
                tracing::debug!("{}: split rule without a second path", context);
                None
            }
            (SecondChannel::Shared, Some(path)) => Some((path, output)),
            (SecondChannel::Own(values), Some(path)) => {
                Some((path, values.encode(&mut state.encoder)?))
            }
        };
        if let Some((path, output)) = second {
            push_channel(animation, binding, target, path, input, output);
            emitted += 1;
        }

        if binding == ChannelBinding::Pointer {
            state
                .extensions_used
                .insert(ANIMATION_POINTER_EXTENSION.to_string());
        }
        if let Some(extension) = &rule.extension {
            let conditional = rule.split == Some(Split::EmissiveStrength);
            if !conditional || prepared.second != SecondChannel::None {
                state.declare_extension(target, extension);
            }
        }

        tracing::debug!(
            "{}: {} channel(s), {} samples",
            context,
            emitted,
            prepared.times.len()
        );
        Ok(emitted)
    }

    /// Find the rule and decide how the channel addresses its target
    fn resolve(
        &self,
        property: &PropertyCurve,
    ) -> std::result::Result<(&'a PropertyRule, ChannelBinding), SkipReason> {
        let target = property.target;
        let rule = self
            .table
            .get(target.kind, &property.property)
            .ok_or_else(|| SkipReason::UnknownProperty {
                kind: target.kind,
                property: property.property.clone(),
            })?;

        if let Some(slot) = &rule.texture {
            if target.kind == ObjectKind::Material && !self.scene.has_texture(target, slot) {
                return Err(SkipReason::MissingTexture(slot.clone()));
            }
        }

        let binding = if self.use_animation_pointer {
            ChannelBinding::Pointer
        } else if rule.native {
            let node = self
                .scene
                .node_index_of(target)
                .ok_or(SkipReason::TargetNotExported)?;
            ChannelBinding::Node(node)
        } else {
            return Err(SkipReason::PointerDisabled);
        };
        Ok((rule, binding))
    }

    fn prepare(
        &self,
        rule: &PropertyRule,
        target: ObjectRef,
        baked: BakedSample,
    ) -> std::result::Result<Prepared, SkipReason> {
        let BakedSample { times, values } = self.reduce(baked)?;
        let first = values.first().ok_or(SkipReason::NoCurves)?;
        let mismatch = || SkipReason::ValueMismatch {
            path: rule.path.clone(),
            found: first.value_type(),
        };

        let (primary, second) = match rule.split {
            None => (self.transform(rule, target, &values).ok_or_else(mismatch)?, SecondChannel::None),
            Some(Split::Mirror) => (
                self.transform(rule, target, &values).ok_or_else(mismatch)?,
                SecondChannel::Shared,
            ),
            Some(Split::ScaleOffset) => {
                let (scales, offsets): (Vec<[f32; 2]>, Vec<[f32; 2]>) = collect(&values, |v| match v {
                    PropertyValue::Vec4(v) => {
                        let (scale, offset) = decompose_scale_offset(*v);
                        Some((scale.to_array(), offset.to_array()))
                    }
                    _ => None,
                })
                .ok_or_else(mismatch)?
                .into_iter()
                .unzip();
                (Output::Vec2(scales), SecondChannel::Own(Output::Vec2(offsets)))
            }
            Some(Split::EmissiveStrength) => {
                let (colors, strengths): (Vec<_>, Vec<f32>) = collect(&values, |v| match v {
                    PropertyValue::Color(c) | PropertyValue::Vec4(c) => Some(decompose_emission(*c)),
                    _ => None,
                })
                .ok_or_else(mismatch)?
                .into_iter()
                .unzip();
                let primary = if rule.transform.keep_alpha {
                    Output::Vec4(colors.iter().map(|c| c.to_array()).collect())
                } else {
                    Output::Vec3(colors.iter().map(|c| c.truncate().to_array()).collect())
                };
                let second = if strengths.iter().any(|&s| s > 1.0) {
                    SecondChannel::Own(Output::Scalars(strengths))
                } else {
                    SecondChannel::None
                };
                (primary, second)
            }
        };

        Ok(Prepared {
            times,
            primary,
            second,
        })
    }

    /// Drop redundant samples, comparing blend shape weights as whole rows
    fn reduce(&self, baked: BakedSample) -> std::result::Result<BakedSample, SkipReason> {
        let BakedSample { times, values } = baked;
        let width = match values.first() {
            Some(PropertyValue::Floats(row)) => Some(row.len()),
            _ => None,
        };

        if let Some(width) = width {
            let mut flat = Vec::with_capacity(values.len() * width);
            for value in &values {
                match value {
                    PropertyValue::Floats(row) if row.len() == width => flat.extend_from_slice(row),
                    _ => return Err(SkipReason::RaggedWeights),
                }
            }
            if !self.reduce_keyframes {
                return Ok(BakedSample { times, values });
            }
            let (times, flat) = reduce_keyframe_blocks(&times, &flat, width);
            let values = flat
                .chunks_exact(width.max(1))
                .map(|row| PropertyValue::Floats(SmallVec::from_slice(row)))
                .collect();
            return Ok(BakedSample { times, values });
        }

        if !self.reduce_keyframes {
            return Ok(BakedSample { times, values });
        }
        let (times, values) = reduce_keyframes(&times, &values);
        Ok(BakedSample { times, values })
    }

    /// Apply the rule's per-sample transform; `None` if the values are mixed
    fn transform(
        &self,
        rule: &PropertyRule,
        target: ObjectRef,
        values: &[PropertyValue],
    ) -> Option<Output> {
        let transform = &rule.transform;
        let multiplier = self.multiplier(transform, target);
        let scalar = |v: f32| {
            let v = if transform.flip_range { 1.0 - v } else { v };
            multiplier.map_or(v, |m| v * m)
        };

        let output = match values.first()? {
            PropertyValue::Float(_) => Output::Scalars(collect(values, |v| match v {
                PropertyValue::Float(x) => Some(scalar(*x)),
                _ => None,
            })?),
            PropertyValue::Floats(_) => {
                let rows = collect(values, |v| match v {
                    PropertyValue::Floats(row) => Some(row.iter().map(|&x| scalar(x)).collect::<Vec<_>>()),
                    _ => None,
                })?;
                Output::Scalars(rows.concat())
            }
            PropertyValue::Vec2(_) => Output::Vec2(collect(values, |v| match v {
                PropertyValue::Vec2(v) => Some((*v * multiplier.unwrap_or(1.0)).to_array()),
                _ => None,
            })?),
            PropertyValue::Vec3(_) => Output::Vec3(collect(values, |v| match v {
                PropertyValue::Vec3(v) => {
                    let v = *v * multiplier.unwrap_or(1.0);
                    let v = if transform.switch_handedness {
                        switch_handedness_vec3(v)
                    } else {
                        v
                    };
                    Some(v.to_array())
                }
                _ => None,
            })?),
            PropertyValue::Vec4(_) => Output::Vec4(collect(values, |v| match v {
                PropertyValue::Vec4(v) => Some((*v * multiplier.unwrap_or(1.0)).to_array()),
                _ => None,
            })?),
            PropertyValue::Color(_) => {
                let colors = collect(values, |v| match v {
                    PropertyValue::Color(c) if transform.linear_color => Some(color_to_linear(*c)),
                    PropertyValue::Color(c) => Some(*c),
                    _ => None,
                })?;
                if transform.keep_alpha {
                    Output::Vec4(colors.iter().map(|c| c.to_array()).collect())
                } else {
                    Output::Vec3(colors.iter().map(|c| c.truncate().to_array()).collect())
                }
            }
            PropertyValue::Quat(_) => {
                let flip = transform.switch_handedness
                    && self
                        .scene
                        .owner_node(target)
                        .is_some_and(|node| self.scene.flips_look_direction(node));
                Output::Vec4(collect(values, |v| match v {
                    PropertyValue::Quat(q) if transform.switch_handedness => {
                        Some(convert_rotation(*q, flip).to_array())
                    }
                    PropertyValue::Quat(q) => Some(q.to_array()),
                    _ => None,
                })?)
            }
        };
        Some(output)
    }

    /// Fixed multiplier, or the reciprocal blend shape range for weights
    fn multiplier(&self, transform: &ValueTransform, target: ObjectRef) -> Option<f32> {
        if transform.normalize_blend_weights {
            if let Some(range) = self
                .scene
                .blend_shape_weight_range(target)
                .filter(|&r| r > 0.0)
            {
                return Some(1.0 / range);
            }
        }
        transform.multiplier
    }
}

fn collect<T>(
    values: &[PropertyValue],
    f: impl FnMut(&PropertyValue) -> Option<T>,
) -> Option<Vec<T>> {
    values.iter().map(f).collect()
}

fn push_channel(
    animation: &mut Animation,
    binding: ChannelBinding,
    target: ObjectRef,
    path: &str,
    input: AccessorIndex,
    output: AccessorIndex,
) {
    let sampler = animation.samplers.len() as u32;
    animation.samplers.push(AnimationSampler {
        input: input.0,
        interpolation: Interpolation::Linear,
        output: output.0,
    });

    let channel = match binding {
        ChannelBinding::Node(node) => Channel {
            sampler,
            target: ChannelTarget {
                node: Some(node),
                path: path.to_string(),
                extensions: None,
            },
            pointer: None,
        },
        ChannelBinding::Pointer => Channel {
            sampler,
            target: ChannelTarget {
                node: None,
                path: POINTER_PATH.to_string(),
                extensions: Some(ChannelTargetExtensions {
                    animation_pointer: PointerExtension {
                        pointer: String::new(),
                    },
                }),
            },
            pointer: Some(PointerBinding::new(target, path)),
        },
    };
    animation.channels.push(channel);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::linear_to_gamma;
    use crate::scene::{NodeHandle, SceneIndex};
    use crate::value::ValueType;
    use glam::{Quat, Vec2, Vec3, Vec4};

    const NODE: NodeHandle = NodeHandle(1);
    const PLAIN_NODE: NodeHandle = NodeHandle(2);
    const MATERIAL: ObjectRef = ObjectRef::new(ObjectKind::Material, 40);
    const CAMERA: ObjectRef = ObjectRef::new(ObjectKind::OrthographicCamera, 50);

    fn scene() -> SceneIndex {
        let mut scene = SceneIndex::new();
        scene
            .add_node(NODE, Some(3))
            .add_node(PLAIN_NODE, Some(4))
            .attach(NODE, MATERIAL, Some(0))
            .attach(NODE, CAMERA, Some(0))
            .add_texture(MATERIAL, "baseColorTexture");
        scene
    }

    fn property(target: ObjectRef, name: &str, value_type: ValueType) -> PropertyCurve {
        PropertyCurve::new(target, name, value_type)
    }

    fn baked(values: Vec<PropertyValue>) -> BakedSample {
        let times = (0..values.len()).map(|i| i as f32 * 0.5).collect();
        BakedSample { times, values }
    }

    fn read_output(state: &ExportState, accessor: u32) -> Vec<f32> {
        let accessor = &state.encoder.accessors()[accessor as usize];
        let view = &state.encoder.views()[accessor.buffer_view.unwrap() as usize];
        let start = view.byte_offset as usize + accessor.byte_offset as usize;
        let floats = accessor.count as usize * accessor.kind.components();
        state.encoder.data()[start..start + floats * 4]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    struct Fixture {
        table: PropertyTable,
        scene: SceneIndex,
        state: ExportState,
        animation: Animation,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                table: PropertyTable::builtin().unwrap(),
                scene: scene(),
                state: ExportState::new(),
                animation: Animation::named("Clip"),
            }
        }

        fn route(&mut self, pointer: bool, property: &PropertyCurve, values: Vec<PropertyValue>) -> usize {
            let router = PropertyRouter::new(&self.table, &self.scene)
                .with_animation_pointer(pointer)
                .with_keyframe_reduction(false);
            router
                .route(
                    &mut self.state,
                    &mut self.animation,
                    "Clip/test",
                    property,
                    baked(values),
                )
                .unwrap()
        }
    }

    #[test]
    fn test_translation_targets_node_with_x_flipped() {
        let mut fx = Fixture::new();
        let prop = property(ObjectRef::node(NODE), "m_LocalPosition", ValueType::Vector3);
        let emitted = fx.route(
            false,
            &prop,
            vec![
                PropertyValue::Vec3(Vec3::new(1.0, 2.0, 3.0)),
                PropertyValue::Vec3(Vec3::new(4.0, 5.0, 6.0)),
            ],
        );

        assert_eq!(emitted, 1);
        let channel = &fx.animation.channels[0];
        assert_eq!(channel.target.node, Some(3));
        assert_eq!(channel.target.path, "translation");
        assert!(!channel.is_pointer());

        let sampler = &fx.animation.samplers[0];
        assert_eq!(read_output(&fx.state, sampler.input), vec![0.0, 0.5]);
        assert_eq!(
            read_output(&fx.state, sampler.output),
            vec![-1.0, 2.0, 3.0, -4.0, 5.0, 6.0]
        );
        assert!(fx.state.extensions_used.is_empty());
    }

    #[test]
    fn test_rotation_switches_handedness() {
        let mut fx = Fixture::new();
        let prop = property(ObjectRef::node(PLAIN_NODE), "m_LocalRotation", ValueType::Quaternion);
        let q = Quat::from_rotation_y(0.5);
        fx.route(false, &prop, vec![PropertyValue::Quat(q)]);

        assert_eq!(fx.animation.channels[0].target.node, Some(4));
        let out = read_output(&fx.state, fx.animation.samplers[0].output);
        let expected = Quat::from_xyzw(q.x, -q.y, -q.z, q.w);
        assert!(Quat::from_slice(&out).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_camera_node_rotation_turns_around() {
        let mut fx = Fixture::new();
        let prop = property(ObjectRef::node(NODE), "m_LocalRotation", ValueType::Quaternion);
        fx.route(false, &prop, vec![PropertyValue::Quat(Quat::IDENTITY)]);

        let out = read_output(&fx.state, fx.animation.samplers[0].output);
        let forward = Quat::from_slice(&out) * Vec3::Z;
        assert!((forward - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_hdr_emission_splits_into_strength_channel() {
        let mut fx = Fixture::new();
        let prop = property(MATERIAL, "_EmissionColor", ValueType::Color);
        let hdr = Vec4::new(
            linear_to_gamma(2.0),
            linear_to_gamma(1.0),
            linear_to_gamma(0.5),
            1.0,
        );
        let emitted = fx.route(true, &prop, vec![PropertyValue::Color(hdr)]);

        assert_eq!(emitted, 2);
        let paths: Vec<&str> = fx
            .animation
            .channels
            .iter()
            .map(|c| c.pointer.as_ref().unwrap().property.as_str())
            .collect();
        assert_eq!(
            paths,
            [
                "emissiveFactor",
                "extensions/KHR_materials_emissive_strength/emissiveStrength"
            ]
        );

        let color = read_output(&fx.state, fx.animation.samplers[0].output);
        assert_eq!(color.len(), 3);
        assert!((Vec3::from_slice(&color) - Vec3::new(1.0, 0.5, 0.25)).length() < 1e-4);
        let strength = read_output(&fx.state, fx.animation.samplers[1].output);
        assert!(strength[0] > 1.0);

        assert!(fx.state.extensions_used.contains("KHR_materials_emissive_strength"));
        assert!(fx.state.extensions_used.contains(ANIMATION_POINTER_EXTENSION));
        assert!(fx.state.material_extensions[&MATERIAL].contains("KHR_materials_emissive_strength"));
    }

    #[test]
    fn test_ldr_emission_has_single_channel() {
        let mut fx = Fixture::new();
        let prop = property(MATERIAL, "_EmissionColor", ValueType::Color);
        let emitted = fx.route(
            true,
            &prop,
            vec![
                PropertyValue::Color(Vec4::new(1.0, 0.5, 0.0, 1.0)),
                PropertyValue::Color(Vec4::new(0.2, 0.2, 0.2, 1.0)),
            ],
        );

        assert_eq!(emitted, 1);
        assert!(!fx.state.extensions_used.contains("KHR_materials_emissive_strength"));
        assert!(fx.state.material_extensions.is_empty());
    }

    #[test]
    fn test_texture_transform_splits_scale_and_offset() {
        let mut fx = Fixture::new();
        let prop = property(MATERIAL, "_MainTex_ST", ValueType::Vector4);
        let emitted = fx.route(true, &prop, vec![PropertyValue::Vec4(Vec4::new(2.0, 0.5, 0.1, 0.2))]);

        assert_eq!(emitted, 2);
        let scale = read_output(&fx.state, fx.animation.samplers[0].output);
        let offset = read_output(&fx.state, fx.animation.samplers[1].output);
        assert_eq!(Vec2::from_slice(&scale), Vec2::new(2.0, 0.5));
        assert_eq!(Vec2::from_slice(&offset), Vec2::new(0.1, 0.3));
        // both channels share the time accessor
        assert_eq!(fx.animation.samplers[0].input, fx.animation.samplers[1].input);
        assert!(fx.state.extensions_used.contains("KHR_texture_transform"));
    }

    #[test]
    fn test_missing_texture_skips_with_warning() {
        let mut fx = Fixture::new();
        let prop = property(MATERIAL, "_EmissionMap_ST", ValueType::Vector4);
        let emitted = fx.route(true, &prop, vec![PropertyValue::Vec4(Vec4::ONE)]);

        assert_eq!(emitted, 0);
        assert!(fx.animation.channels.is_empty());
        assert!(fx.state.encoder.accessors().is_empty());
        assert_eq!(
            fx.state.report.count(&SkipReason::MissingTexture("emissiveTexture".into())),
            1
        );
    }

    #[test]
    fn test_unknown_property_and_disabled_pointer_are_skipped() {
        let mut fx = Fixture::new();
        let unknown = property(MATERIAL, "_WobbleAmount", ValueType::Float);
        assert_eq!(fx.route(true, &unknown, vec![PropertyValue::Float(1.0)]), 0);

        let metallic = property(MATERIAL, "_Metallic", ValueType::Float);
        assert_eq!(fx.route(false, &metallic, vec![PropertyValue::Float(1.0)]), 0);

        assert_eq!(fx.state.report.warnings.len(), 2);
        assert!(matches!(
            fx.state.report.warnings[0].reason,
            SkipReason::UnknownProperty { .. }
        ));
        assert_eq!(fx.state.report.warnings[1].reason, SkipReason::PointerDisabled);
    }

    #[test]
    fn test_smoothness_becomes_roughness() {
        let mut fx = Fixture::new();
        let prop = property(MATERIAL, "_Smoothness", ValueType::Float);
        fx.route(
            true,
            &prop,
            vec![PropertyValue::Float(0.25), PropertyValue::Float(1.0)],
        );
        let out = read_output(&fx.state, fx.animation.samplers[0].output);
        assert_eq!(out, vec![0.75, 0.0]);
        assert_eq!(
            fx.animation.channels[0].pointer.as_ref().unwrap().property,
            "pbrMetallicRoughness/roughnessFactor"
        );
    }

    #[test]
    fn test_orthographic_size_is_mirrored() {
        let mut fx = Fixture::new();
        let prop = property(CAMERA, "orthographic size", ValueType::Float);
        let emitted = fx.route(true, &prop, vec![PropertyValue::Float(5.0)]);

        assert_eq!(emitted, 2);
        let [ymag, xmag] = [&fx.animation.samplers[0], &fx.animation.samplers[1]];
        assert_eq!(ymag.output, xmag.output);
        assert_eq!(
            fx.animation.channels[1].pointer.as_ref().unwrap().property,
            "orthographic/xmag"
        );
    }

    #[test]
    fn test_constant_property_is_reduced_to_endpoints() {
        let mut fx = Fixture::new();
        let prop = property(ObjectRef::node(NODE), "m_LocalScale", ValueType::Vector3);
        let router = PropertyRouter::new(&fx.table, &fx.scene);
        router
            .route(
                &mut fx.state,
                &mut fx.animation,
                "Clip/scale",
                &prop,
                baked(vec![PropertyValue::Vec3(Vec3::ONE); 6]),
            )
            .unwrap();

        let input = &fx.state.encoder.accessors()[fx.animation.samplers[0].input as usize];
        assert_eq!(input.count, 2);
        assert_eq!(read_output(&fx.state, fx.animation.samplers[0].input), vec![0.0, 2.5]);
    }

    #[test]
    fn test_weights_use_blend_shape_range() {
        let mut fx = Fixture::new();
        let mesh = ObjectRef::new(ObjectKind::SkinnedMesh, 60);
        fx.scene
            .attach(NODE, mesh, None)
            .set_blend_shape_weight_range(mesh, 50.0);
        let prop = property(mesh, "weights", ValueType::Float);
        fx.route(
            false,
            &prop,
            vec![PropertyValue::Floats(SmallVec::from_slice(&[50.0, 25.0]))],
        );

        assert_eq!(fx.animation.channels[0].target.node, Some(3));
        assert_eq!(fx.animation.channels[0].target.path, "weights");
        assert_eq!(read_output(&fx.state, fx.animation.samplers[0].output), vec![1.0, 0.5]);
    }

    #[test]
    fn test_ragged_weights_are_skipped() {
        let mut fx = Fixture::new();
        let mesh = ObjectRef::new(ObjectKind::SkinnedMesh, 60);
        fx.scene.attach(NODE, mesh, None);
        let prop = property(mesh, "weights", ValueType::Float);
        let emitted = fx.route(
            false,
            &prop,
            vec![
                PropertyValue::Floats(SmallVec::from_slice(&[1.0, 0.0])),
                PropertyValue::Floats(SmallVec::from_slice(&[1.0])),
            ],
        );
        assert_eq!(emitted, 0);
        assert_eq!(fx.state.report.count(&SkipReason::RaggedWeights), 1);
    }
}
