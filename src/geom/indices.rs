//! 24-bit vertex index packing.
//!
//! Indices are stored as contiguous little-endian triples with no padding.

use crate::util::{Error, Result};

/// Bytes per packed index.
pub const INDEX_SIZE: usize = 3;

/// Largest value representable in 24 bits.
pub const MAX_INDEX: u32 = (1 << 24) - 1;

/// Pack indices into 3-byte little-endian triples.
///
/// Fails on the first index that does not fit in 24 bits.
pub fn encode_indices(indices: &[u32]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(indices.len() * INDEX_SIZE);
    for (position, &index) in indices.iter().enumerate() {
        if index > MAX_INDEX {
            return Err(Error::IndexOutOfRange { index, position });
        }
        let b = index.to_le_bytes();
        out.extend_from_slice(&b[..INDEX_SIZE]);
    }
    Ok(out)
}

/// Unpack 3-byte little-endian triples.
pub fn decode_indices(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % INDEX_SIZE != 0 {
        return Err(Error::MalformedIndices(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(INDEX_SIZE)
        .map(|t| t[0] as u32 | (t[1] as u32) << 8 | (t[2] as u32) << 16)
        .collect())
}
