//! Uniform resampling of property curves
//!
//! Curves with arbitrary key spacing are sampled at a fixed rate. Constant
//! (stepped) segments are reproduced with a pair of samples so that linear
//! interpolation in the output still shows a hard cut.

use glam::{EulerRot, Quat, Vec2, Vec3, Vec4};
use smallvec::SmallVec;

use crate::curve::{is_step_segment, Curve, PropertyCurve, TangentMode};
use crate::error::SkipReason;
use crate::value::{PropertyValue, ValueType};

/// Default baking rate in samples per second
pub const DEFAULT_SAMPLE_RATE: f32 = 30.0;

/// Lower clamp for the playback speed multiplier
pub const MIN_SPEED: f32 = 0.01;

/// Offset of the first sample of a hold pair after the previous sample (seconds)
pub const HOLD_EPSILON: f32 = 0.0001;

/// Fraction of a sample interval the second sample of a hold pair is pushed forward
pub const HOLD_NUDGE: f32 = 0.999;

/// Dense, uniformly sampled values of one property
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BakedSample {
    pub times: Vec<f32>,
    pub values: Vec<PropertyValue>,
}

impl BakedSample {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Clip-level baking parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BakeOptions {
    /// Clip duration in seconds
    pub length: f32,
    pub sample_rate: f32,
    /// Playback speed; output times are divided by it
    pub speed: f32,
}

impl BakeOptions {
    pub fn new(length: f32) -> Self {
        Self {
            length,
            sample_rate: DEFAULT_SAMPLE_RATE,
            speed: 1.0,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Number of uniform samples, at least one
    pub fn sample_count(&self) -> usize {
        ((self.length.max(0.0) * self.sample_rate).ceil() as usize).max(1)
    }
}

/// Forward-only keyframe cursor over one curve
struct Cursor<'a> {
    curve: &'a Curve,
    index: usize,
}

impl<'a> Cursor<'a> {
    fn new(curve: &'a Curve) -> Self {
        Self { curve, index: 0 }
    }

    /// Move to the first key at or after `time` (or the last key)
    fn advance(&mut self, time: f32) {
        let keys = self.curve.keys();
        while self.index + 1 < keys.len() && keys[self.index].time < time {
            self.index += 1;
        }
    }

    /// Whether `time` lies inside a segment that holds its value
    fn in_step(&self, time: f32) -> bool {
        let keys = self.curve.keys();
        let Some(key) = keys.get(self.index) else {
            return false;
        };
        if key.time < time {
            return false;
        }
        match self.index.checked_sub(1) {
            Some(prev) => is_step_segment(&keys[prev], key),
            None => key.in_mode == TangentMode::Constant,
        }
    }
}

/// Resample a property curve into uniform time/value arrays
///
/// Times are sampled unscaled and divided by the clamped speed at the end.
/// At a constant step both samples of the hold pair carry the new value; the
/// cut sits at `previous + HOLD_EPSILON`, so the previous value is held by the
/// sample before the pair.
pub fn bake_property(
    property: &PropertyCurve,
    options: &BakeOptions,
) -> Result<BakedSample, SkipReason> {
    property.validate()?;

    let length = options.length.max(0.0);
    let speed = options.speed.max(MIN_SPEED);
    let count = options.sample_count();
    let dt = length / count as f32;

    let mut cursors: SmallVec<[Cursor<'_>; 4]> =
        property.curves().iter().map(Cursor::new).collect();
    let mut baked = BakedSample {
        times: Vec::with_capacity(count * 2),
        values: Vec::with_capacity(count * 2),
    };

    for i in 0..count {
        let last_sample = i == count - 1;
        let mut time = if last_sample { length } else { i as f32 * dt };

        for cursor in cursors.iter_mut() {
            cursor.advance(time);
        }
        let stepped = cursors.iter().any(|c| c.in_step(time));

        match baked.times.last().copied() {
            Some(previous) if stepped => {
                if !last_sample {
                    time += dt * HOLD_NUDGE;
                }
                let hold = previous + HOLD_EPSILON.min(0.5 * (time - previous));
                let value = evaluate(property, time);
                baked.times.push(hold);
                baked.values.push(value.clone());
                baked.times.push(time);
                baked.values.push(value);
            }
            _ => {
                baked.times.push(time);
                baked.values.push(evaluate(property, time));
            }
        }
    }

    for t in baked.times.iter_mut() {
        *t /= speed;
    }

    Ok(baked)
}

/// Assemble the typed value of a validated property at `time`
fn evaluate(property: &PropertyCurve, time: f32) -> PropertyValue {
    let curves = property.curves();
    let at = |i: usize| curves.get(i).map_or(0.0, |c| c.evaluate(time));

    if curves.len() == 1 {
        return PropertyValue::Float(at(0));
    }

    match property.value_type {
        ValueType::Float => PropertyValue::Floats(curves.iter().map(|c| c.evaluate(time)).collect()),
        ValueType::Vector2 => PropertyValue::Vec2(Vec2::new(at(0), at(1))),
        ValueType::Vector3 => PropertyValue::Vec3(Vec3::new(at(0), at(1), at(2))),
        ValueType::Vector4 => PropertyValue::Vec4(Vec4::new(at(0), at(1), at(2), at(3))),
        ValueType::Color => {
            let alpha = if curves.len() > 3 { at(3) } else { 1.0 };
            PropertyValue::Color(Vec4::new(at(0), at(1), at(2), alpha))
        }
        ValueType::Quaternion if curves.len() == 3 => {
            PropertyValue::Quat(euler_degrees_to_quat(at(0), at(1), at(2)))
        }
        ValueType::Quaternion => PropertyValue::Quat(Quat::from_xyzw(at(0), at(1), at(2), at(3))),
    }
}

/// Euler angles in degrees, applied around Z, then X, then Y
pub fn euler_degrees_to_quat(x: f32, y: f32, z: f32) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        y.to_radians(),
        x.to_radians(),
        z.to_radians(),
    )
}
