//! Per-sample value transforms applied before encoding

use glam::{Quat, Vec2, Vec3, Vec4};

/// sRGB-encoded channel to linear
pub fn gamma_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear channel to sRGB encoding
pub fn linear_to_gamma(v: f32) -> f32 {
    if v <= 0.0031308 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Convert rgb to linear, leaving alpha untouched
pub fn color_to_linear(color: Vec4) -> Vec4 {
    Vec4::new(
        gamma_to_linear(color.x),
        gamma_to_linear(color.y),
        gamma_to_linear(color.z),
        color.w,
    )
}

/// Split a packed texture `scale.xy, offset.zw` into glTF scale and offset
///
/// The texture origin moves from bottom-left to top-left, so the vertical
/// offset becomes `1 - w - y`.
pub fn decompose_scale_offset(input: Vec4) -> (Vec2, Vec2) {
    let scale = Vec2::new(input.x, input.y);
    let offset = Vec2::new(input.z, 1.0 - input.w - input.y);
    (scale, offset)
}

/// Split an HDR emissive color into a [0, 1] color and a strength
///
/// Returns the linear rgb color (alpha clamped) and the strength, which is
/// only meaningful when it exceeds 1.
pub fn decompose_emission(input: Vec4) -> (Vec4, f32) {
    let mut linear = color_to_linear(input);
    let max = linear.x.max(linear.y).max(linear.z);
    if max > 1.0 {
        linear.x /= max;
        linear.y /= max;
        linear.z /= max;
    }
    linear.w = linear.w.clamp(0.0, 1.0);
    (linear, linear_to_gamma(max))
}

/// Mirror a position across the X axis
pub fn switch_handedness_vec3(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, v.y, v.z)
}

/// Mirror a rotation across the X axis
pub fn switch_handedness_quat(q: Quat) -> Quat {
    Quat::from_xyzw(q.x, -q.y, -q.z, q.w)
}

/// 180 degree turn around Y, applied to lights and cameras whose forward axis is -Z in glTF
pub const LOOK_DIRECTION_FLIP: Quat = Quat::from_xyzw(0.0, -1.0, 0.0, 0.0);

/// Convert a rotation, optionally turning the node's forward axis around
pub fn convert_rotation(q: Quat, flip_look_direction: bool) -> Quat {
    let q = if flip_look_direction {
        q * LOOK_DIRECTION_FLIP
    } else {
        q
    };
    switch_handedness_quat(q).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gamma_round_trip() {
        for i in 0..=20 {
            let v = i as f32 / 20.0;
            assert!((linear_to_gamma(gamma_to_linear(v)) - v).abs() < 1e-5);
        }
        assert_eq!(gamma_to_linear(0.0), 0.0);
        assert!((gamma_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!((gamma_to_linear(0.5) - 0.214_041).abs() < 1e-5);
    }

    #[test]
    fn test_scale_offset_flips_v() {
        let (scale, offset) = decompose_scale_offset(Vec4::new(2.0, 0.5, 0.1, 0.2));
        assert_eq!(scale, Vec2::new(2.0, 0.5));
        assert_eq!(offset, Vec2::new(0.1, 0.3));
    }

    #[test]
    fn test_emission_within_range_has_unit_strength() {
        let (color, strength) = decompose_emission(Vec4::new(1.0, 0.5, 0.0, 1.0));
        assert!((color.x - 1.0).abs() < 1e-6);
        assert!((strength - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_emission_hdr_is_normalized() {
        // gamma values whose linear equivalents are (4, 2, 1)
        let input = Vec4::new(linear_to_gamma(4.0), linear_to_gamma(2.0), linear_to_gamma(1.0), 3.0);
        let (color, strength) = decompose_emission(input);
        assert!((color.truncate() - Vec3::new(1.0, 0.5, 0.25)).length() < 1e-4);
        assert_eq!(color.w, 1.0);
        assert!((strength - linear_to_gamma(4.0)).abs() < 1e-4);
        assert!(strength > 1.0);
    }

    #[test]
    fn test_handedness() {
        assert_eq!(
            switch_handedness_vec3(Vec3::new(1.0, 2.0, 3.0)),
            Vec3::new(-1.0, 2.0, 3.0)
        );
        let q = Quat::from_xyzw(0.1, 0.2, 0.3, 0.9);
        assert_eq!(switch_handedness_quat(q), Quat::from_xyzw(0.1, -0.2, -0.3, 0.9));
    }

    #[test]
    fn test_look_direction_flip_turns_forward_axis() {
        let converted = convert_rotation(Quat::IDENTITY, true);
        let forward = converted * Vec3::Z;
        assert!((forward - Vec3::NEG_Z).length() < 1e-6);
        assert_eq!(convert_rotation(Quat::IDENTITY, false), Quat::IDENTITY);
    }
}
