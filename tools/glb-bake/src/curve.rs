//! Source animation curves and per-property curve sets

use glam::Vec4;
use serde::Deserialize;

use crate::error::SkipReason;
use crate::scene::ObjectRef;
use crate::value::ValueType;

/// How a keyframe's tangent on one side is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TangentMode {
    /// Use the stored tangent value
    #[default]
    Free,
    /// Slope towards the neighbouring key
    Linear,
    /// Hold the left key's value until the next key
    Constant,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub in_tangent: f32,
    #[serde(default)]
    pub out_tangent: f32,
    #[serde(default)]
    pub in_mode: TangentMode,
    #[serde(default)]
    pub out_mode: TangentMode,
}

impl Keyframe {
    /// Key with flat free tangents
    pub const fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            in_tangent: 0.0,
            out_tangent: 0.0,
            in_mode: TangentMode::Free,
            out_mode: TangentMode::Free,
        }
    }

    pub const fn linear(time: f32, value: f32) -> Self {
        Self {
            in_mode: TangentMode::Linear,
            out_mode: TangentMode::Linear,
            ..Self::new(time, value)
        }
    }

    /// Key the curve jumps to: the segment arriving here holds the previous value
    pub const fn stepped(time: f32, value: f32) -> Self {
        Self {
            in_mode: TangentMode::Constant,
            ..Self::new(time, value)
        }
    }

    pub const fn with_tangents(mut self, in_tangent: f32, out_tangent: f32) -> Self {
        self.in_tangent = in_tangent;
        self.out_tangent = out_tangent;
        self
    }
}

/// Whether the segment from `k0` to `k1` holds `k0`'s value
pub fn is_step_segment(k0: &Keyframe, k1: &Keyframe) -> bool {
    k0.out_mode == TangentMode::Constant || k1.in_mode == TangentMode::Constant
}

/// A single-component curve sorted by key time
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Vec<Keyframe>")]
pub struct Curve {
    keys: Vec<Keyframe>,
}

impl From<Vec<Keyframe>> for Curve {
    fn from(keys: Vec<Keyframe>) -> Self {
        Self::new(keys)
    }
}

impl Curve {
    pub fn new(mut keys: Vec<Keyframe>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// Two-key curve holding `value` from 0 to `end_time`
    pub fn constant(value: f32, end_time: f32) -> Self {
        Self {
            keys: vec![
                Keyframe::linear(0.0, value),
                Keyframe::linear(end_time.max(0.0), value),
            ],
        }
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Evaluate with cubic Hermite interpolation, clamping outside the key range
    pub fn evaluate(&self, time: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        let i = self.keys.partition_point(|k| k.time <= time);
        let k0 = &self.keys[i - 1];
        let k1 = &self.keys[i];

        if is_step_segment(k0, k1) {
            return k0.value;
        }

        let dt = k1.time - k0.time;
        if dt <= 0.0 {
            return k1.value;
        }

        let slope = (k1.value - k0.value) / dt;
        let m0 = match k0.out_mode {
            TangentMode::Linear => slope,
            _ => k0.out_tangent,
        };
        let m1 = match k1.in_mode {
            TangentMode::Linear => slope,
            _ => k1.in_tangent,
        };

        let s = (time - k0.time) / dt;
        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        h00 * k0.value + h10 * dt * m0 + h01 * k1.value + h11 * dt * m1
    }
}

// ============================================================================
// Property curves
// ============================================================================

/// Component index encoded by a curve name suffix (`.x`, `.g`, ...)
pub(crate) fn component_slot(name: &str) -> Option<usize> {
    let suffix = name.rsplit_once('.').map(|(_, s)| s)?;
    match suffix {
        "x" | "r" => Some(0),
        "y" | "g" => Some(1),
        "z" | "b" => Some(2),
        "w" | "a" => Some(3),
        _ => None,
    }
}

/// All component curves animating one logical property of one object
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyCurve {
    pub property: String,
    pub value_type: ValueType,
    pub target: ObjectRef,
    curves: Vec<Curve>,
    names: Vec<String>,
}

impl PropertyCurve {
    pub fn new(target: ObjectRef, property: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            property: property.into(),
            value_type,
            target,
            curves: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Add a component curve as it is discovered, e.g. `"_Color.g"`
    pub fn add_curve(&mut self, name: impl Into<String>, curve: Curve) {
        self.names.push(name.into());
        self.curves.push(curve);
    }

    pub fn with_curve(mut self, name: impl Into<String>, curve: Curve) -> Self {
        self.add_curve(name, curve);
        self
    }

    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    pub fn curve_names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn has_component(&self, slot: usize) -> bool {
        self.names.iter().any(|n| component_slot(n) == Some(slot))
    }

    /// Put component curves in x/y/z/w (r/g/b/a) order
    ///
    /// Curves without a component suffix keep their relative order after the
    /// named ones, so blend shape weights are untouched.
    pub fn sort_components(&mut self) {
        if matches!(self.value_type, ValueType::Float) {
            return;
        }
        let mut pairs: Vec<(String, Curve)> = self
            .names
            .drain(..)
            .zip(self.curves.drain(..))
            .collect();
        pairs.sort_by_key(|(name, _)| component_slot(name).unwrap_or(usize::MAX));
        for (name, curve) in pairs {
            self.names.push(name);
            self.curves.push(curve);
        }
    }

    /// Check the curve count against the declared value type
    pub fn validate(&self) -> Result<(), SkipReason> {
        if self.curves.is_empty() {
            return Err(SkipReason::NoCurves);
        }

        let found = self.curves.len();
        let count_error = |expected| SkipReason::ComponentCount {
            value_type: self.value_type,
            expected,
            found,
        };

        match self.value_type {
            ValueType::Float => Ok(()),
            ValueType::Vector2 | ValueType::Vector3 | ValueType::Vector4 => {
                let expected = self.value_type.component_count();
                if found == expected {
                    Ok(())
                } else {
                    Err(count_error(expected))
                }
            }
            ValueType::Color => {
                for (slot, channel) in ['r', 'g', 'b'].into_iter().enumerate() {
                    if !self.has_component(slot) {
                        return Err(SkipReason::MissingColorChannel(channel));
                    }
                }
                if found > 4 {
                    return Err(count_error(4));
                }
                Ok(())
            }
            ValueType::Quaternion => {
                if found == 3 || found == 4 {
                    Ok(())
                } else {
                    Err(count_error(4))
                }
            }
        }
    }

    /// Add constant curves for the first `slots` components the clip does not animate
    ///
    /// `current` holds the object's present value in x/y/z/w (r/g/b/a) order.
    pub fn fill_missing_components(&mut self, current: Vec4, slots: usize, end_time: f32) {
        if self.value_type == ValueType::Float {
            return;
        }
        let suffixes = if self.value_type == ValueType::Color {
            ['r', 'g', 'b', 'a']
        } else {
            ['x', 'y', 'z', 'w']
        };
        for (slot, suffix) in suffixes.into_iter().enumerate().take(slots) {
            if !self.has_component(slot) {
                let name = format!("{}.{}", self.property, suffix);
                self.add_curve(name, Curve::constant(current[slot], end_time));
            }
        }
        self.sort_components();
    }

    /// Longest key time over all component curves
    pub fn end_time(&self) -> f32 {
        self.curves
            .iter()
            .filter_map(|c| c.keys().last())
            .map(|k| k.time)
            .fold(0.0, f32::max)
    }
}
