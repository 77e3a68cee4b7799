//! Named texture payloads and pixel codecs.
//!
//! Texture chunks hold encoded image bytes (JPEG, PNG or WEBP). The codec
//! itself never touches pixels: decoding and encoding go through a
//! [`CodecRegistry`] the caller builds and passes in. With the `image` feature
//! enabled, [`CodecRegistry::with_image_codecs`] provides codecs for all three
//! formats.

mod codec;
#[cfg(feature = "image")]
mod image_codec;

pub use codec::*;
#[cfg(feature = "image")]
pub use image_codec::*;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Encoded image format tag stored with each named texture.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TextureFormat {
    #[default]
    Jpeg = 0,
    Png = 1,
    Webp = 2,
}

impl TryFrom<u32> for TextureFormat {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Jpeg),
            1 => Ok(Self::Png),
            2 => Ok(Self::Webp),
            other => Err(Error::TextureCodec(format!("unknown texture format {}", other))),
        }
    }
}

impl From<TextureFormat> for u32 {
    fn from(f: TextureFormat) -> u32 {
        f as u32
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        })
    }
}

/// Decoded RGBA8 pixels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

impl TextureImage {
    /// Create an image, checking the pixel buffer size.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as u64 * height as u64 * 4;
        if pixels.len() as u64 != expected {
            return Err(Error::TextureCodec(format!(
                "{}x{} image needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Single-color image.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let n = width as usize * height as usize;
        Self { width, height, pixels: rgba.repeat(n) }
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.pixels[i..i + 4];
        Some([p[0], p[1], p[2], p[3]])
    }
}
