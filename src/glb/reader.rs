//! Container reader.
//!
//! The reader peeks the first [`HEADER_SIZE`] bytes. If they do not start with
//! the magic number the whole stream is plain JSON and the peeked bytes are
//! kept as the start of it. Otherwise the header is validated, declared
//! lengths are checked against [`DecodeLimits`], and each chunk is read with a
//! bounded reader so nothing past its declared end is consumed.

use std::io::Read;

use tracing::{debug, trace};

use super::format::*;
use crate::util::{Error, Result};

/// Default maximum number of external buffers per document.
pub const DEFAULT_MAX_EXTERNAL_BUFFERS: usize = 10;

/// Default maximum total allocation for declared lengths (4 GiB).
pub const DEFAULT_MAX_MEMORY_ALLOCATION: u64 = u32::MAX as u64;

const INITIAL_RESERVE: u64 = 1 << 26;

/// Resource bounds applied to untrusted input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeLimits {
    pub max_external_buffers: usize,
    pub max_memory_allocation: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_external_buffers: DEFAULT_MAX_EXTERNAL_BUFFERS,
            max_memory_allocation: DEFAULT_MAX_MEMORY_ALLOCATION,
        }
    }
}

impl DecodeLimits {
    pub fn with_max_external_buffers(mut self, n: usize) -> Self {
        self.max_external_buffers = n;
        self
    }

    pub fn with_max_memory_allocation(mut self, bytes: u64) -> Self {
        self.max_memory_allocation = bytes;
        self
    }

    /// Fail if `requested` bytes exceed the allocation limit.
    pub fn check_allocation(&self, what: &'static str, requested: u64) -> Result<()> {
        if requested > self.max_memory_allocation {
            return Err(Error::QuotaExceeded { what, requested, limit: self.max_memory_allocation });
        }
        Ok(())
    }

    /// Fail if `count` external buffers exceed the limit.
    pub fn check_external_buffers(&self, count: usize) -> Result<()> {
        if count > self.max_external_buffers {
            return Err(Error::QuotaExceeded {
                what: "external buffer count",
                requested: count as u64,
                limit: self.max_external_buffers as u64,
            });
        }
        Ok(())
    }
}

/// Decoded container: JSON text plus the embedded blob, if any.
#[derive(Clone, Debug, Default)]
pub struct Container {
    pub json: Vec<u8>,
    pub blob: Option<Vec<u8>>,
    /// None for plain JSON input.
    pub variant: Option<ContainerVariant>,
}

impl Container {
    /// Check if the input had a binary envelope.
    #[inline]
    pub fn is_binary(&self) -> bool {
        self.variant.is_some()
    }
}

/// Read exactly `len` bytes, never consuming more.
pub fn read_bounded<R: Read>(reader: &mut R, len: u64, name: &str) -> Result<Vec<u8>> {
    // Grow past the initial reservation only as bytes actually arrive.
    let mut data = Vec::with_capacity(len.min(INITIAL_RESERVE) as usize);
    reader.by_ref().take(len).read_to_end(&mut data)?;
    if (data.len() as u64) < len {
        return Err(Error::truncated(name, len, data.len() as u64));
    }
    Ok(data)
}

/// Fill `buf` as far as the stream allows and return how many bytes were read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn read_plain_json<R: Read>(reader: &mut R, peeked: &[u8], limits: &DecodeLimits) -> Result<Container> {
    let mut json = peeked.to_vec();
    let cap = limits.max_memory_allocation.saturating_add(1);
    reader.by_ref().take(cap).read_to_end(&mut json)?;
    limits.check_allocation("JSON document", json.len() as u64)?;
    debug!("plain JSON input, {} bytes", json.len());
    Ok(Container { json, blob: None, variant: None })
}

fn validate_header(header: &GlbHeader, limits: &DecodeLimits) -> Result<(ContainerVariant, u64)> {
    let variant = ContainerVariant::from_version(header.version)
        .ok_or_else(|| Error::header(format!("unsupported container version {}", header.version)))?;

    if !variant.accepts_json_chunk(header.json.kind) {
        return Err(Error::header(format!(
            "unexpected JSON chunk type {:#010x} for version {}",
            header.json.kind, header.version
        )));
    }

    let remaining = header.remaining_after_json().ok_or_else(|| {
        Error::header(format!(
            "JSON chunk length {} exceeds container length {}",
            header.json.length, header.length
        ))
    })?;

    limits.check_allocation("container length", header.length as u64)?;
    Ok((variant, remaining))
}

fn read_bin_chunk<R: Read>(reader: &mut R, remaining: u64) -> Result<Option<Vec<u8>>> {
    if remaining == 0 {
        return Ok(None);
    }
    if remaining < CHUNK_HEADER_SIZE as u64 {
        return Err(Error::header(format!("{} stray bytes after JSON chunk", remaining)));
    }

    let raw = read_bounded(reader, CHUNK_HEADER_SIZE as u64, "BIN header")?;
    let mut bytes = [0u8; CHUNK_HEADER_SIZE];
    bytes.copy_from_slice(&raw);
    let chunk = ChunkHeader::from_bytes(&bytes);

    if chunk.kind != CHUNK_BIN {
        return Err(Error::header(format!("unexpected chunk type {:#010x}, expected BIN", chunk.kind)));
    }
    if chunk.length as u64 + CHUNK_HEADER_SIZE as u64 > remaining {
        return Err(Error::header(format!(
            "BIN chunk length {} exceeds the {} bytes left in the container",
            chunk.length, remaining
        )));
    }

    let blob = read_bounded(reader, chunk.length as u64, "BIN")?;
    trace!("BIN chunk {} bytes", blob.len());
    Ok(Some(blob))
}

/// Read a container, falling back to plain JSON when there is no envelope.
pub fn read_container<R: Read>(mut reader: R, limits: &DecodeLimits) -> Result<Container> {
    let mut peek = [0u8; HEADER_SIZE];
    let n = read_up_to(&mut reader, &mut peek)?;
    if n < HEADER_SIZE {
        return read_plain_json(&mut reader, &peek[..n], limits);
    }

    let header = GlbHeader::from_bytes(&peek);
    if !header.has_magic() {
        return read_plain_json(&mut reader, &peek, limits);
    }

    let (variant, remaining) = validate_header(&header, limits)?;
    debug!(
        "container version {} ({:?}), length {}, JSON {} bytes",
        header.version, variant, header.length, header.json.length
    );

    let json = read_bounded(&mut reader, header.json.length as u64, "JSON")?;
    let blob = match variant {
        ContainerVariant::Dual => read_bin_chunk(&mut reader, remaining)?,
        ContainerVariant::Legacy => Some(read_bounded(&mut reader, remaining, "blob")?),
    };

    Ok(Container { json, blob, variant: Some(variant) })
}
