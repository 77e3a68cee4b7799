//! Lookup-texture dimensions.
//!
//! Vertex tables are consumed as RGBA textures: every vertex record occupies a
//! whole number of RGBA texels, optionally followed by extra texels (the color
//! table). Small tables are laid out as a single row; larger ones as a roughly
//! square texture whose width is a multiple of the texels-per-entry count so
//! that no entry straddles two rows.

use super::{Error, Result};

/// Maximum width of a single-row lookup texture.
pub const MAX_TEXTURE_SIZE: u32 = 1024;

/// Width and height of a lookup texture, in RGBA texels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of texels the texture can hold.
    #[inline]
    pub fn texel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Compute texture dimensions for `n_entries` entries of `n_rgba_per_entry`
/// texels each, plus `n_extra_rgba` trailing texels.
///
/// Fails if the total texel count does not fit in a `u32`.
pub fn compute_dimensions(n_entries: u32, n_rgba_per_entry: u32, n_extra_rgba: u32) -> Result<Dimensions> {
    let total = n_entries as u64 * n_rgba_per_entry as u64 + n_extra_rgba as u64;
    let n_rgba = u32::try_from(total).map_err(|_| Error::QuotaExceeded {
        what: "lookup texture texels",
        requested: total,
        limit: u32::MAX as u64,
    })?;
    if n_rgba < MAX_TEXTURE_SIZE {
        return Ok(Dimensions::new(n_rgba, 1));
    }

    let mut width = (n_rgba as f64).sqrt().ceil() as u32;
    if n_rgba_per_entry > 0 {
        let remainder = width % n_rgba_per_entry;
        if remainder != 0 {
            width += n_rgba_per_entry - remainder;
        }
    }

    let height = n_rgba.div_ceil(width);
    Ok(Dimensions::new(width, height))
}
