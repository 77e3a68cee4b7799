//! Pixel codec trait and lookup table.

use std::collections::HashMap;
use std::fmt;

use super::{TextureFormat, TextureImage};
use crate::util::{Error, Result};

/// Converts between encoded image bytes and RGBA8 pixels.
pub trait TextureCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<TextureImage>;
    fn encode(&self, image: &TextureImage) -> Result<Vec<u8>>;
}

/// Codecs keyed by texture format.
///
/// Nothing is registered implicitly; an empty registry leaves texture chunks
/// as opaque bytes.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: HashMap<TextureFormat, Box<dyn TextureCodec>>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<_> = self.codecs.keys().map(|k| k.to_string()).collect();
        formats.sort();
        f.debug_struct("CodecRegistry").field("formats", &formats).finish()
    }
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a codec, replacing any previous one for `format`.
    pub fn register(&mut self, format: TextureFormat, codec: impl TextureCodec + 'static) -> &mut Self {
        self.codecs.insert(format, Box::new(codec));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, format: TextureFormat, codec: impl TextureCodec + 'static) -> Self {
        self.register(format, codec);
        self
    }

    #[inline]
    pub fn supports(&self, format: TextureFormat) -> bool {
        self.codecs.contains_key(&format)
    }

    pub fn get(&self, format: TextureFormat) -> Option<&dyn TextureCodec> {
        self.codecs.get(&format).map(|c| c.as_ref())
    }

    fn require(&self, format: TextureFormat) -> Result<&dyn TextureCodec> {
        self.get(format)
            .ok_or_else(|| Error::TextureCodec(format!("no codec registered for {}", format)))
    }

    pub fn decode(&self, format: TextureFormat, bytes: &[u8]) -> Result<TextureImage> {
        self.require(format)?.decode(bytes)
    }

    pub fn encode(&self, format: TextureFormat, image: &TextureImage) -> Result<Vec<u8>> {
        self.require(format)?.encode(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stores width, height and raw pixels.
    struct RawCodec;

    impl TextureCodec for RawCodec {
        fn decode(&self, bytes: &[u8]) -> Result<TextureImage> {
            if bytes.len() < 8 {
                return Err(Error::TextureCodec("short".into()));
            }
            let w = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            let h = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
            TextureImage::new(w, h, bytes[8..].to_vec())
        }

        fn encode(&self, image: &TextureImage) -> Result<Vec<u8>> {
            let mut out = image.width.to_le_bytes().to_vec();
            out.extend_from_slice(&image.height.to_le_bytes());
            out.extend_from_slice(&image.pixels);
            Ok(out)
        }
    }

    #[test]
    fn test_registry() -> Result<()> {
        let reg = CodecRegistry::new().with(TextureFormat::Png, RawCodec);
        assert!(reg.supports(TextureFormat::Png));
        assert!(!reg.supports(TextureFormat::Jpeg));

        let img = TextureImage::filled(2, 2, [9, 8, 7, 6]);
        let bytes = reg.encode(TextureFormat::Png, &img)?;
        assert_eq!(reg.decode(TextureFormat::Png, &bytes)?, img);

        let err = reg.decode(TextureFormat::Jpeg, &bytes).unwrap_err();
        assert!(matches!(err, Error::TextureCodec(_)));
        Ok(())
    }
}
