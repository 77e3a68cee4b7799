//! Range-based quantization of positions and texture coordinates.
//!
//! A float range is mapped onto a 16-bit integer grid: per axis, `origin` is
//! the low bound and `scale` is `range_scale / extent`. An axis with zero
//! extent gets `scale == 0`, meaning every value on that axis is the origin.

use crate::util::{Range2d, Range3d, Vec2, Vec3};

/// Grid size for 16-bit quantization.
pub const RANGE_SCALE_16: u16 = 0xffff;

/// Grid size for 8-bit quantization.
pub const RANGE_SCALE_8: u16 = 0xff;

#[inline]
fn compute_scale(extent: f32, range_scale: u16) -> f32 {
    if extent == 0.0 {
        0.0
    } else {
        range_scale as f32 / extent
    }
}

#[inline]
fn range_diagonal(scale: f32) -> f32 {
    if scale == 0.0 {
        0.0
    } else {
        RANGE_SCALE_16 as f32 / scale
    }
}

/// Quantize a scalar onto a grid of `range_scale + 1` steps.
///
/// Rounds half up (`floor(0.5 + x)`) and clamps to `[0, range_scale]`.
#[inline]
pub fn quantize(value: f32, origin: f32, scale: f32, range_scale: u16) -> u16 {
    let x = 0.5 + (value as f64 - origin as f64) * scale as f64;
    x.min(range_scale as f64).max(0.0).floor() as u16
}

/// Map a quantized scalar back to its float value.
#[inline]
pub fn unquantize(qpos: u16, origin: f32, scale: f32) -> f32 {
    if scale == 0.0 {
        origin
    } else {
        origin + qpos as f32 / scale
    }
}

/// Check whether `value` lands inside the 16-bit grid without clamping.
pub fn is_quantizable(value: f32, origin: f32, scale: f32) -> bool {
    let x = 0.5 + (value as f64 - origin as f64) * scale as f64;
    (0.0..RANGE_SCALE_16 as f64 + 1.0).contains(&x)
}

/// Check whether `qpos` is a valid value for a grid of `range_scale + 1` steps.
#[inline]
pub fn is_quantized(qpos: u16, range_scale: u16) -> bool {
    qpos <= range_scale
}

/// Quantization parameters for 3D positions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QParams3d {
    pub origin: Vec3,
    pub scale: Vec3,
}

impl QParams3d {
    /// Derive params from a range.
    pub fn from_range(range: &Range3d, range_scale: u16) -> Self {
        let extent = range.diagonal();
        Self {
            origin: range.low,
            scale: Vec3::new(
                compute_scale(extent.x, range_scale),
                compute_scale(extent.y, range_scale),
                compute_scale(extent.z, range_scale),
            ),
        }
    }

    /// Recover the range actually representable by these params.
    ///
    /// This is the range persisted alongside quantized data, since it is
    /// what a decoder will reconstruct the params from.
    pub fn range(&self) -> Range3d {
        let d = Vec3::new(
            range_diagonal(self.scale.x),
            range_diagonal(self.scale.y),
            range_diagonal(self.scale.z),
        );
        Range3d::new(self.origin, self.origin + d)
    }

    /// Quantize a point onto the 16-bit grid.
    pub fn quantize_point(&self, pos: Vec3) -> [u16; 3] {
        [
            quantize(pos.x, self.origin.x, self.scale.x, RANGE_SCALE_16),
            quantize(pos.y, self.origin.y, self.scale.y, RANGE_SCALE_16),
            quantize(pos.z, self.origin.z, self.scale.z, RANGE_SCALE_16),
        ]
    }

    /// Map a quantized point back to float space.
    pub fn unquantize_point(&self, qpos: [u16; 3]) -> Vec3 {
        Vec3::new(
            unquantize(qpos[0], self.origin.x, self.scale.x),
            unquantize(qpos[1], self.origin.y, self.scale.y),
            unquantize(qpos[2], self.origin.z, self.scale.z),
        )
    }

    /// Column-major matrix mapping quantized coordinates to float space.
    pub fn decode_matrix(&self) -> [f32; 16] {
        let inv = |s: f32| if s == 0.0 { 0.0 } else { 1.0 / s };
        [
            inv(self.scale.x), 0.0, 0.0, 0.0,
            0.0, inv(self.scale.y), 0.0, 0.0,
            0.0, 0.0, inv(self.scale.z), 0.0,
            self.origin.x, self.origin.y, self.origin.z, 1.0,
        ]
    }
}

/// Quantization parameters for 2D texture coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QParams2d {
    pub origin: Vec2,
    pub scale: Vec2,
}

impl QParams2d {
    /// Derive params from a range.
    pub fn from_range(range: &Range2d, range_scale: u16) -> Self {
        let extent = range.diagonal();
        Self {
            origin: range.low,
            scale: Vec2::new(
                compute_scale(extent.x, range_scale),
                compute_scale(extent.y, range_scale),
            ),
        }
    }

    /// Recover the range actually representable by these params.
    pub fn range(&self) -> Range2d {
        let d = Vec2::new(range_diagonal(self.scale.x), range_diagonal(self.scale.y));
        Range2d::new(self.origin, self.origin + d)
    }

    pub fn quantize_point(&self, pos: Vec2) -> [u16; 2] {
        [
            quantize(pos.x, self.origin.x, self.scale.x, RANGE_SCALE_16),
            quantize(pos.y, self.origin.y, self.scale.y, RANGE_SCALE_16),
        ]
    }

    pub fn unquantize_point(&self, qpos: [u16; 2]) -> Vec2 {
        Vec2::new(
            unquantize(qpos[0], self.origin.x, self.scale.x),
            unquantize(qpos[1], self.origin.y, self.scale.y),
        )
    }
}
