//! Typed values produced by baking

use glam::{Quat, Vec2, Vec3, Vec4};
use serde::Deserialize;
use smallvec::SmallVec;

/// Declared type of an animated property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Float,
    Vector2,
    Vector3,
    Vector4,
    Color,
    Quaternion,
}

impl ValueType {
    /// Number of component curves a complete property has
    pub const fn component_count(self) -> usize {
        match self {
            ValueType::Float => 1,
            ValueType::Vector2 => 2,
            ValueType::Vector3 => 3,
            ValueType::Vector4 | ValueType::Color | ValueType::Quaternion => 4,
        }
    }
}

/// One baked sample of a property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Float(f32),
    /// One value per curve, e.g. all blend shape weights at one time
    Floats(SmallVec<[f32; 8]>),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Color(Vec4),
    Quat(Quat),
}

impl PropertyValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Float(_) | PropertyValue::Floats(_) => ValueType::Float,
            PropertyValue::Vec2(_) => ValueType::Vector2,
            PropertyValue::Vec3(_) => ValueType::Vector3,
            PropertyValue::Vec4(_) => ValueType::Vector4,
            PropertyValue::Color(_) => ValueType::Color,
            PropertyValue::Quat(_) => ValueType::Quaternion,
        }
    }

    /// Flat component view of the value
    pub fn components(&self) -> SmallVec<[f32; 8]> {
        match self {
            PropertyValue::Float(v) => SmallVec::from_slice(&[*v]),
            PropertyValue::Floats(values) => values.clone(),
            PropertyValue::Vec2(v) => SmallVec::from_slice(&v.to_array()),
            PropertyValue::Vec3(v) => SmallVec::from_slice(&v.to_array()),
            PropertyValue::Vec4(v) | PropertyValue::Color(v) => SmallVec::from_slice(&v.to_array()),
            PropertyValue::Quat(q) => SmallVec::from_slice(&q.to_array()),
        }
    }
}
