//! 16-bit octahedral normal encoding.
//!
//! A unit vector is projected onto the octahedron, folded into the upper
//! hemisphere, and each of the two resulting coordinates is stored as an
//! unsigned byte. The x coordinate lives in the high byte, y in the low byte.

use crate::util::Vec3;

#[inline]
fn sign_not_zero(v: f32) -> f32 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[inline]
fn encode_component(c: f32) -> u16 {
    let x = 0.5 + (c.clamp(-1.0, 1.0) * 0.5 + 0.5) * 255.0;
    x.clamp(0.0, 255.0).floor() as u16
}

#[inline]
fn decode_component(b: u16) -> f32 {
    (b as f32 / 255.0) * 2.0 - 1.0
}

/// Encode a direction into 16 bits.
///
/// The input does not need to be normalized. A zero vector encodes as +Z.
pub fn encode_normal(n: Vec3) -> u16 {
    let n = n.normalize_or(Vec3::Z);
    let l1 = n.x.abs() + n.y.abs() + n.z.abs();
    let mut u = n.x / l1;
    let mut v = n.y / l1;

    if n.z < 0.0 {
        let (ua, va) = (u.abs(), v.abs());
        u = (1.0 - va) * sign_not_zero(u);
        v = (1.0 - ua) * sign_not_zero(v);
    }

    (encode_component(u) << 8) | encode_component(v)
}

/// Decode a 16-bit octahedral normal back to a unit vector.
pub fn decode_normal(value: u16) -> Vec3 {
    let u = decode_component(value >> 8);
    let v = decode_component(value & 0xff);
    let mut n = Vec3::new(u, v, 1.0 - u.abs() - v.abs());

    if n.z < 0.0 {
        let (x, y) = (n.x, n.y);
        n.x = (1.0 - y.abs()) * sign_not_zero(x);
        n.y = (1.0 - x.abs()) * sign_not_zero(y);
    }

    n.normalize_or(Vec3::Z)
}
