//! Stream decoder.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use tracing::{debug, warn};

use super::resource::{validate_resource_uri, ResourceReader};
use crate::chunk::BufferSet;
use crate::document::Document;
use crate::glb::{read_container, DecodeLimits};
use crate::texture::CodecRegistry;
use crate::util::{Error, Result};

/// Decodes a document from a binary container or plain JSON stream.
///
/// ```ignore
/// let doc = Decoder::new(file)
///     .with_limits(DecodeLimits::default().with_max_external_buffers(2))
///     .with_read_handler(RelativeFileHandler::new("tiles"))
///     .decode()?;
/// ```
pub struct Decoder<R> {
    reader: R,
    limits: DecodeLimits,
    read_handler: Option<Box<dyn ResourceReader>>,
    codecs: Option<Arc<CodecRegistry>>,
}

impl<R> fmt::Debug for Decoder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("limits", &self.limits)
            .field("read_handler", &self.read_handler.is_some())
            .field("codecs", &self.codecs)
            .finish()
    }
}

impl<R: Read> Decoder<R> {
    /// Decoder with default limits, no resource reader and no texture codecs.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            limits: DecodeLimits::default(),
            read_handler: None,
            codecs: None,
        }
    }

    pub fn with_limits(mut self, limits: DecodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Handler used to load buffers that have a `uri`.
    pub fn with_read_handler(mut self, handler: impl ResourceReader + 'static) -> Self {
        self.read_handler = Some(Box::new(handler));
        self
    }

    /// Codecs used to decode named textures to pixels.
    pub fn with_codecs(mut self, codecs: impl Into<Arc<CodecRegistry>>) -> Self {
        self.codecs = Some(codecs.into());
        self
    }

    #[inline]
    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Read and fully decode the document.
    pub fn decode(mut self) -> Result<Document> {
        let container = read_container(&mut self.reader, &self.limits)?;
        let mut doc: Document = serde_json::from_slice(&container.json)?;
        self.check_quotas(&doc)?;

        let buffers = self.load_buffers(&doc, container.blob)?;
        doc.decode_chunk_data(&buffers, self.codecs.as_deref())?;
        Ok(doc)
    }

    fn check_quotas(&self, doc: &Document) -> Result<()> {
        let declared = doc
            .buffers
            .values()
            .fold(0u64, |acc, b| acc.saturating_add(b.byte_length));
        self.limits.check_allocation("declared buffer bytes", declared)?;

        let external = doc.buffers.values().filter(|b| b.is_external()).count();
        self.limits.check_external_buffers(external)?;
        debug!(
            "{} buffers ({} external), {} bytes declared",
            doc.buffers.len(),
            external,
            declared
        );
        Ok(())
    }

    fn load_buffers(&self, doc: &Document, blob: Option<Vec<u8>>) -> Result<BufferSet> {
        let mut set = BufferSet::new(doc.buffer_views.clone());
        let mut blob = blob;

        for (name, buffer) in &doc.buffers {
            let data = match &buffer.uri {
                Some(uri) => {
                    validate_resource_uri(uri)?;
                    let handler = self.read_handler.as_deref().ok_or_else(|| {
                        Error::InvalidBufferReference(format!(
                            "buffer '{}' refers to '{}' but no resource reader is set",
                            name, uri
                        ))
                    })?;
                    handler.read_resource(uri, buffer.byte_length)?
                }
                None => match blob.take() {
                    Some(b) => b,
                    None => {
                        warn!("buffer '{}' has no uri and there is no embedded blob", name);
                        continue;
                    }
                },
            };

            if (data.len() as u64) < buffer.byte_length {
                return Err(Error::truncated(name.clone(), buffer.byte_length, data.len() as u64));
            }
            set.insert_buffer(name.clone(), data);
        }
        Ok(set)
    }
}
