//! Serializable glTF 2.0 objects produced by the encoder and animation pipeline
//!
//! Only the subset of the schema this crate writes is modelled. Indices are
//! plain `u32`s into the session-owned lists.
//!
//! These are not `gltf-json` types because its channel target requires a
//! `node`, and `KHR_animation_pointer` channels have none.

use serde::{Serialize, Serializer};

/// Accessor component type, serialized as its GL enum value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    UnsignedInt,
    Float,
}

impl ComponentType {
    pub const fn code(self) -> u32 {
        match self {
            ComponentType::Byte => 5120,
            ComponentType::UnsignedByte => 5121,
            ComponentType::Short => 5122,
            ComponentType::UnsignedShort => 5123,
            ComponentType::UnsignedInt => 5125,
            ComponentType::Float => 5126,
        }
    }

    /// Size of one component in bytes
    pub const fn size(self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::UnsignedInt | ComponentType::Float => 4,
        }
    }
}

impl Serialize for ComponentType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.code())
    }
}

/// Element shape of an accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl AccessorType {
    pub const fn components(self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec2 => 2,
            AccessorType::Vec3 => 3,
            AccessorType::Vec4 => 4,
            AccessorType::Mat4 => 16,
        }
    }
}

/// GPU binding hint for a bufferView
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferTarget {
    ArrayBuffer,
    ElementArrayBuffer,
}

impl Serialize for BufferTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(match self {
            BufferTarget::ArrayBuffer => 34962,
            BufferTarget::ElementArrayBuffer => 34963,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: u32,
    pub byte_offset: u32,
    pub byte_length: u32,
    /// `None` means tightly packed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_stride: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<BufferTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_view: Option<u32>,
    #[serde(skip_serializing_if = "is_zero")]
    pub byte_offset: u32,
    pub component_type: ComponentType,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub normalized: bool,
    pub count: u32,
    #[serde(rename = "type")]
    pub kind: AccessorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparse: Option<Sparse>,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sparse {
    pub count: u32,
    pub indices: SparseIndices,
    pub values: SparseValues,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseIndices {
    pub buffer_view: u32,
    pub component_type: ComponentType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseValues {
    pub buffer_view: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationSampler {
    pub input: u32,
    pub interpolation: Interpolation,
    pub output: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointerExtension {
    pub pointer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelTargetExtensions {
    #[serde(rename = "KHR_animation_pointer")]
    pub animation_pointer: PointerExtension,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<u32>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ChannelTargetExtensions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub sampler: u32,
    pub target: ChannelTarget,
    /// Symbolic binding for pointer channels, resolved when the session finishes
    #[serde(skip)]
    pub pointer: Option<crate::pointer::PointerBinding>,
}

impl Channel {
    pub fn is_pointer(&self) -> bool {
        self.pointer.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Animation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub channels: Vec<Channel>,
    pub samplers: Vec<AnimationSampler>,
}

impl Animation {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Drop samplers no channel refers to and renumber the rest
    pub fn compact_samplers(&mut self) {
        let mut remap = vec![None; self.samplers.len()];
        let mut kept = Vec::with_capacity(self.samplers.len());
        for channel in &self.channels {
            let old = channel.sampler as usize;
            if remap[old].is_none() {
                remap[old] = Some(kept.len() as u32);
                kept.push(self.samplers[old].clone());
            }
        }
        for channel in &mut self.channels {
            if let Some(new) = remap[channel.sampler as usize] {
                channel.sampler = new;
            }
        }
        self.samplers = kept;
    }
}
