//! Pixel codecs backed by the `image` crate.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbaImage};

use super::{CodecRegistry, TextureCodec, TextureFormat, TextureImage};
use crate::util::{Error, Result};

/// Codec for one `image` crate format.
#[derive(Clone, Copy, Debug)]
pub struct ImageCodec {
    format: ImageFormat,
}

impl ImageCodec {
    pub fn new(format: TextureFormat) -> Self {
        let format = match format {
            TextureFormat::Jpeg => ImageFormat::Jpeg,
            TextureFormat::Png => ImageFormat::Png,
            TextureFormat::Webp => ImageFormat::WebP,
        };
        Self { format }
    }
}

fn codec_err(e: image::ImageError) -> Error {
    Error::TextureCodec(e.to_string())
}

impl TextureCodec for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<TextureImage> {
        let img = image::load_from_memory_with_format(bytes, self.format).map_err(codec_err)?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        TextureImage::new(width, height, rgba.into_raw())
    }

    fn encode(&self, image: &TextureImage) -> Result<Vec<u8>> {
        let buf = RgbaImage::from_raw(image.width, image.height, image.pixels.clone())
            .ok_or_else(|| Error::TextureCodec("pixel buffer does not match dimensions".into()))?;
        let mut dynamic = DynamicImage::ImageRgba8(buf);
        if self.format == ImageFormat::Jpeg {
            // JPEG has no alpha channel.
            dynamic = DynamicImage::ImageRgb8(dynamic.to_rgb8());
        }

        let mut out = Vec::new();
        dynamic
            .write_to(&mut Cursor::new(&mut out), self.format)
            .map_err(codec_err)?;
        Ok(out)
    }
}

impl CodecRegistry {
    /// Registry with `image`-backed codecs for JPEG, PNG and WEBP.
    pub fn with_image_codecs() -> Self {
        [TextureFormat::Jpeg, TextureFormat::Png, TextureFormat::Webp]
            .into_iter()
            .fold(Self::new(), |reg, f| reg.with(f, ImageCodec::new(f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_lossless() -> Result<()> {
        let reg = CodecRegistry::with_image_codecs();
        let mut img = TextureImage::filled(4, 3, [10, 20, 30, 255]);
        img.pixels[0..4].copy_from_slice(&[255, 0, 0, 128]);

        let bytes = reg.encode(TextureFormat::Png, &img)?;
        assert_eq!(&bytes[1..4], b"PNG");
        assert_eq!(reg.decode(TextureFormat::Png, &bytes)?, img);
        Ok(())
    }

    #[test]
    fn test_jpeg_dimensions() -> Result<()> {
        let reg = CodecRegistry::with_image_codecs();
        let img = TextureImage::filled(8, 8, [200, 100, 50, 255]);
        let bytes = reg.encode(TextureFormat::Jpeg, &img)?;
        let back = reg.decode(TextureFormat::Jpeg, &bytes)?;
        assert_eq!((back.width, back.height), (8, 8));
        Ok(())
    }

    #[test]
    fn test_garbage_input() {
        let reg = CodecRegistry::with_image_codecs();
        assert!(matches!(reg.decode(TextureFormat::Png, b"not a png"), Err(Error::TextureCodec(_))));
    }
}
