//! Container writer.
//!
//! Only the dual-chunk variant is written. The JSON chunk is padded with
//! spaces and the BIN chunk with zeros, both to [`CHUNK_ALIGNMENT`].

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::debug;

use super::format::*;
use crate::chunk::padding_for;
use crate::util::{Error, Result};

const JSON_PAD: u8 = b' ';
const BIN_PAD: u8 = 0;

fn padded_len(len: usize) -> usize {
    len + padding_for(len, CHUNK_ALIGNMENT)
}

fn write_chunk<W: Write>(writer: &mut W, kind: u32, data: &[u8], pad: u8) -> Result<u64> {
    let padded = padded_len(data.len());
    writer.write_u32::<LittleEndian>(padded as u32)?;
    writer.write_u32::<LittleEndian>(kind)?;
    writer.write_all(data)?;
    writer.write_all(&vec![pad; padded - data.len()])?;
    Ok((CHUNK_HEADER_SIZE + padded) as u64)
}

/// Total container length for the given payload sizes.
pub fn container_length(json_len: usize, blob_len: Option<usize>) -> u64 {
    let mut total = (HEADER_SIZE + padded_len(json_len)) as u64;
    if let Some(n) = blob_len {
        total += (CHUNK_HEADER_SIZE + padded_len(n)) as u64;
    }
    total
}

/// Write a version 2 container and return the number of bytes written.
pub fn write_container<W: Write>(mut writer: W, json: &[u8], blob: Option<&[u8]>) -> Result<u64> {
    let length = container_length(json.len(), blob.map(<[u8]>::len));
    if length > u32::MAX as u64 {
        return Err(Error::QuotaExceeded {
            what: "container length",
            requested: length,
            limit: u32::MAX as u64,
        });
    }

    writer.write_u32::<LittleEndian>(GLB_MAGIC)?;
    writer.write_u32::<LittleEndian>(ContainerVariant::Dual.version())?;
    writer.write_u32::<LittleEndian>(length as u32)?;
    let mut written = 12;
    written += write_chunk(&mut writer, CHUNK_JSON, json, JSON_PAD)?;
    if let Some(blob) = blob {
        written += write_chunk(&mut writer, CHUNK_BIN, blob, BIN_PAD)?;
    }
    writer.flush()?;

    debug_assert_eq!(written, length);
    debug!("wrote container: {} bytes (JSON {}, BIN {:?})", written, json.len(), blob.map(|b| b.len()));
    Ok(written)
}
