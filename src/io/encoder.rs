//! Stream encoder.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use super::resource::{validate_resource_uri, ResourceWriter};
use crate::chunk::BINARY_BUFFER;
use crate::document::Document;
use crate::glb::write_container;
use crate::texture::CodecRegistry;
use crate::util::{Error, Result};

/// URI of the blob written next to a plain JSON document.
pub const DEFAULT_BLOB_URI: &str = "binary_glTF.bin";

/// Encodes a document as a binary container or as plain JSON.
///
/// In plain JSON mode the blob is written through the resource writer and the
/// embedded buffer gets a `uri`.
pub struct Encoder<W> {
    writer: W,
    binary: bool,
    blob_uri: String,
    write_handler: Option<Box<dyn ResourceWriter>>,
    codecs: Option<Arc<CodecRegistry>>,
}

impl<W> fmt::Debug for Encoder<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("binary", &self.binary)
            .field("blob_uri", &self.blob_uri)
            .field("write_handler", &self.write_handler.is_some())
            .field("codecs", &self.codecs)
            .finish()
    }
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            binary: true,
            blob_uri: DEFAULT_BLOB_URI.to_string(),
            write_handler: None,
            codecs: None,
        }
    }

    /// Write a binary container (default) or plain JSON.
    pub fn as_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    pub fn with_write_handler(mut self, handler: impl ResourceWriter + 'static) -> Self {
        self.write_handler = Some(Box::new(handler));
        self
    }

    /// URI for the external blob in plain JSON mode.
    pub fn with_blob_uri(mut self, uri: impl Into<String>) -> Self {
        self.blob_uri = uri.into();
        self
    }

    /// Codecs used to encode texture pixels.
    pub fn with_codecs(mut self, codecs: impl Into<Arc<CodecRegistry>>) -> Self {
        self.codecs = Some(codecs.into());
        self
    }

    /// Encode `doc` and return the number of bytes written to the stream.
    ///
    /// The document's buffer and view tables are rewritten to match the
    /// output.
    pub fn encode(mut self, doc: &mut Document) -> Result<u64> {
        let finalized = doc.encode_chunk_data(self.codecs.as_deref())?;
        let has_blob = doc.buffers.contains_key(BINARY_BUFFER);

        if self.binary {
            let json = serde_json::to_vec(doc)?;
            let blob = has_blob.then_some(finalized.blob.as_slice());
            return write_container(&mut self.writer, &json, blob);
        }

        if has_blob {
            validate_resource_uri(&self.blob_uri)?;
            let handler = self.write_handler.as_deref().ok_or_else(|| {
                Error::invalid(format!("no resource writer for blob '{}'", self.blob_uri))
            })?;
            handler.write_resource(&self.blob_uri, &finalized.blob)?;
            if let Some(buffer) = doc.buffers.get_mut(BINARY_BUFFER) {
                buffer.uri = Some(self.blob_uri.clone());
            }
        }

        let json = serde_json::to_vec(doc)?;
        self.writer.write_all(&json)?;
        self.writer.flush()?;
        debug!("wrote plain JSON: {} bytes, blob {} bytes", json.len(), finalized.blob.len());
        Ok(json.len() as u64)
    }
}
