//! RGBA color records as stored in vertex-table color tables.
//!
//! On the wire the alpha channel is inverted (`255 - alpha`, i.e. a
//! transparency) and RGB is premultiplied by the source alpha.

use bytemuck::{Pod, Zeroable};

/// 8-bit RGBA color, laid out exactly as stored.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    #[inline]
    pub fn to_bytes(self) -> [u8; 4] {
        bytemuck::cast(self)
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        bytemuck::cast(bytes)
    }

    /// Pack as a little-endian `0xAABBGGRR` integer.
    #[inline]
    pub fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.to_bytes())
    }
}

#[inline]
fn scale_channel(c: u8, a: u8) -> u8 {
    (c as f64 * (a as f64 / 255.0) + 0.5).floor() as u8
}

/// Convert a straight-alpha color to its stored form.
///
/// Opaque colors are stored unchanged with alpha 0. Fully transparent colors
/// are stored as `(0, 0, 0, 255)`.
///
/// The 0 and 255 cases are keyed on the source alpha, not the stored one.
/// Swapping them would decode every opaque color as black.
pub fn pack_color(color: Rgba) -> Rgba {
    let stored = 255 - color.a;
    match color.a {
        0 => Rgba::new(0, 0, 0, stored),
        255 => Rgba::new(color.r, color.g, color.b, stored),
        a => Rgba::new(
            scale_channel(color.r, a),
            scale_channel(color.g, a),
            scale_channel(color.b, a),
            stored,
        ),
    }
}

/// Convert a stored color back to straight alpha.
///
/// Premultiplication loses precision, so this is only an approximate inverse
/// of [`pack_color`] for partially transparent colors.
pub fn unpack_color(stored: Rgba) -> Rgba {
    let alpha = 255 - stored.a;
    match alpha {
        0 | 255 => Rgba::new(stored.r, stored.g, stored.b, alpha),
        a => {
            let f = 255.0 / a as f64;
            let un = |c: u8| (c as f64 * f + 0.5).floor().min(255.0) as u8;
            Rgba::new(un(stored.r), un(stored.g), un(stored.b), alpha)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opaque_unchanged() {
        let stored = pack_color(Rgba::rgb(200, 100, 50));
        assert_eq!(stored, Rgba::new(200, 100, 50, 0));
        assert_eq!(unpack_color(stored), Rgba::rgb(200, 100, 50));
    }

    #[test]
    fn test_transparent_zeroed() {
        let stored = pack_color(Rgba::new(200, 100, 50, 0));
        assert_eq!(stored, Rgba::new(0, 0, 0, 255));
        assert_eq!(unpack_color(stored), Rgba::new(0, 0, 0, 0));
    }

    #[test]
    fn test_premultiplied() {
        // stored alpha = 255 - 155 = 100; 200 * 155/255 = 121.57 -> 122
        let stored = pack_color(Rgba::new(200, 255, 1, 155));
        assert_eq!(stored.a, 100);
        assert_eq!(stored.r, 122);
        assert_eq!(stored.g, 155);
        assert_eq!(stored.b, 1);

        let back = unpack_color(stored);
        assert_eq!(back.a, 155);
        assert!((back.r as i32 - 200).abs() <= 2);
        assert_eq!(back.g, 255);
    }

    #[test]
    fn test_byte_layout() {
        let c = Rgba::new(1, 2, 3, 4);
        assert_eq!(c.to_bytes(), [1, 2, 3, 4]);
        assert_eq!(Rgba::from_bytes([1, 2, 3, 4]), c);
        assert_eq!(c.to_u32(), 0x0403_0201);
    }
}
