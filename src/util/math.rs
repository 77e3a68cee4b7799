//! Math type re-exports and range types used by quantization.
//!
//! This module re-exports the `glam` vector types the codec works with and
//! provides axis-aligned ranges in 2D (UV space) and 3D (position space).

pub use glam::{Mat4, Vec2, Vec3, Vec4};

use std::fmt;

/// 3D axis-aligned range.
#[derive(Clone, Copy, PartialEq)]
pub struct Range3d {
    pub low: Vec3,
    pub high: Vec3,
}

impl Range3d {
    /// Empty range (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        low: Vec3::splat(f32::INFINITY),
        high: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a new range from low and high corners.
    #[inline]
    pub const fn new(low: Vec3, high: Vec3) -> Self {
        Self { low, high }
    }

    /// Create a range containing every point of `points`.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut range = Self::EMPTY;
        for p in points {
            range.extend(p);
        }
        range
    }

    /// Build a range from JSON-style `decodedMin` / `decodedMax` arrays.
    ///
    /// Returns None unless both slices hold at least three components.
    pub fn from_slices(low: &[f32], high: &[f32]) -> Option<Self> {
        if low.len() < 3 || high.len() < 3 {
            return None;
        }
        Some(Self::new(
            Vec3::new(low[0], low[1], low[2]),
            Vec3::new(high[0], high[1], high[2]),
        ))
    }

    /// Check if no point has been added yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.low.x > self.high.x || self.low.y > self.high.y || self.low.z > self.high.z
    }

    /// Widen this range to include a point.
    #[inline]
    pub fn extend(&mut self, p: Vec3) {
        self.low = self.low.min(p);
        self.high = self.high.max(p);
    }

    /// Widen this range to include a point given by components.
    #[inline]
    pub fn extend_xyz(&mut self, x: f32, y: f32, z: f32) {
        self.extend(Vec3::new(x, y, z));
    }

    /// Extent per axis.
    #[inline]
    pub fn diagonal(&self) -> Vec3 {
        self.high - self.low
    }

    /// Check whether a point lies inside the range (inclusive).
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.low).all() && p.cmple(self.high).all()
    }
}

impl Default for Range3d {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Range3d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Range3d({:?} - {:?})", self.low, self.high)
    }
}

/// 2D axis-aligned range.
#[derive(Clone, Copy, PartialEq)]
pub struct Range2d {
    pub low: Vec2,
    pub high: Vec2,
}

impl Range2d {
    /// Empty range (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        low: Vec2::splat(f32::INFINITY),
        high: Vec2::splat(f32::NEG_INFINITY),
    };

    #[inline]
    pub const fn new(low: Vec2, high: Vec2) -> Self {
        Self { low, high }
    }

    /// Create a range containing every point of `points`.
    pub fn from_points<I: IntoIterator<Item = Vec2>>(points: I) -> Self {
        let mut range = Self::EMPTY;
        for p in points {
            range.extend(p);
        }
        range
    }

    /// Build a range from JSON-style `decodedMin` / `decodedMax` arrays.
    pub fn from_slices(low: &[f32], high: &[f32]) -> Option<Self> {
        if low.len() < 2 || high.len() < 2 {
            return None;
        }
        Some(Self::new(Vec2::new(low[0], low[1]), Vec2::new(high[0], high[1])))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.low.x > self.high.x || self.low.y > self.high.y
    }

    /// Widen this range to include a point.
    #[inline]
    pub fn extend(&mut self, p: Vec2) {
        self.low = self.low.min(p);
        self.high = self.high.max(p);
    }

    #[inline]
    pub fn extend_xy(&mut self, x: f32, y: f32) {
        self.extend(Vec2::new(x, y));
    }

    #[inline]
    pub fn diagonal(&self) -> Vec2 {
        self.high - self.low
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.cmpge(self.low).all() && p.cmple(self.high).all()
    }
}

impl Default for Range2d {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Range2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Range2d({:?} - {:?})", self.low, self.high)
    }
}
