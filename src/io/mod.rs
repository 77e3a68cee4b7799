//! Reading and writing documents.
//!
//! [`Decoder`] and [`Encoder`] work on any `Read` / `Write`. The path helpers
//! add a memory-mapped input and resolve external buffers next to the file.
//!
//! ```ignore
//! let mut doc = imdl::open("tile.imdl")?;
//! imdl::save_binary(&mut doc, "copy.imdl")?;
//! ```

mod decoder;
mod encoder;
mod resource;

pub use decoder::*;
pub use encoder::*;
pub use resource::*;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use tracing::debug;

use crate::document::Document;
use crate::glb::DecodeLimits;
use crate::texture::CodecRegistry;
use crate::util::{Error, Result};

fn parent_dir(path: &Path) -> std::path::PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Open and decode a document with default limits and no texture codecs.
pub fn open(path: impl AsRef<Path>) -> Result<Document> {
    open_with(path, DecodeLimits::default(), None)
}

/// Open and decode a document.
///
/// External buffers are resolved relative to the file's directory.
pub fn open_with(
    path: impl AsRef<Path>,
    limits: DecodeLimits,
    codecs: Option<Arc<CodecRegistry>>,
) -> Result<Document> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;
    let size = file.metadata()?.len();

    let mmap = if size > 0 {
        // Safety: the file is opened read-only and the map is dropped before returning
        Some(unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?)
    } else {
        None
    };
    debug!("decoding {} ({} bytes)", path.display(), size);

    let bytes: &[u8] = mmap.as_deref().unwrap_or(&[]);
    let mut decoder = Decoder::new(bytes)
        .with_limits(limits)
        .with_read_handler(RelativeFileHandler::new(parent_dir(path)));
    if let Some(codecs) = codecs {
        decoder = decoder.with_codecs(codecs);
    }
    decoder.decode()
}

/// Save as plain JSON; the blob goes to `<stem>.bin` next to it.
pub fn save(doc: &mut Document, path: impl AsRef<Path>) -> Result<u64> {
    save_with(doc, path, false, None)
}

/// Save as a binary container.
pub fn save_binary(doc: &mut Document, path: impl AsRef<Path>) -> Result<u64> {
    save_with(doc, path, true, None)
}

/// Save as a binary container or as plain JSON with an external blob.
pub fn save_with(
    doc: &mut Document,
    path: impl AsRef<Path>,
    binary: bool,
    codecs: Option<Arc<CodecRegistry>>,
) -> Result<u64> {
    let path = path.as_ref();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("document");

    let file = File::create(path)?;
    let mut encoder = Encoder::new(BufWriter::new(file))
        .as_binary(binary)
        .with_blob_uri(format!("{}.bin", stem))
        .with_write_handler(RelativeFileHandler::new(parent_dir(path)));
    if let Some(codecs) = codecs {
        encoder = encoder.with_codecs(codecs);
    }
    let written = encoder.encode(doc)?;
    debug!("saved {} ({} bytes, binary: {})", path.display(), written, binary);
    Ok(written)
}
