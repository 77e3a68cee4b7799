//! Container constants and header structures.

use byteorder::{ByteOrder, LittleEndian};

/// Magic number at the start of a binary container ("glTF").
pub const GLB_MAGIC: u32 = 0x4654_6C67;

/// Chunk type tag of the JSON chunk ("JSON").
pub const CHUNK_JSON: u32 = 0x4E4F_534A;

/// Chunk type tag of the binary chunk ("BIN\0").
pub const CHUNK_BIN: u32 = 0x004E_4942;

/// JSON chunk type used by legacy containers ("content format JSON").
pub const LEGACY_CONTENT_JSON: u32 = 0;

/// Size of a chunk sub-header in bytes.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Size of the container header including the JSON chunk sub-header.
pub const HEADER_SIZE: usize = 12 + CHUNK_HEADER_SIZE;

/// Chunk payloads are padded to this many bytes.
pub const CHUNK_ALIGNMENT: usize = 4;

/// Container wire-format variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContainerVariant {
    /// Version 1: JSON chunk followed by one untyped blob.
    Legacy = 1,
    /// Version 2: typed JSON chunk followed by a typed BIN chunk.
    Dual = 2,
}

impl ContainerVariant {
    pub fn from_version(version: u32) -> Option<Self> {
        match version {
            1 => Some(Self::Legacy),
            2 => Some(Self::Dual),
            _ => None,
        }
    }

    #[inline]
    pub fn version(self) -> u32 {
        self as u32
    }

    /// Check if `kind` is an acceptable JSON chunk type for this variant.
    pub fn accepts_json_chunk(self, kind: u32) -> bool {
        match self {
            Self::Legacy => kind == CHUNK_JSON || kind == LEGACY_CONTENT_JSON,
            Self::Dual => kind == CHUNK_JSON,
        }
    }
}

/// Chunk sub-header: payload length and type tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkHeader {
    pub length: u32,
    pub kind: u32,
}

impl ChunkHeader {
    pub fn new(length: u32, kind: u32) -> Self {
        Self { length, kind }
    }

    pub fn to_bytes(&self) -> [u8; CHUNK_HEADER_SIZE] {
        let mut out = [0u8; CHUNK_HEADER_SIZE];
        LittleEndian::write_u32(&mut out[0..4], self.length);
        LittleEndian::write_u32(&mut out[4..8], self.kind);
        out
    }

    pub fn from_bytes(bytes: &[u8; CHUNK_HEADER_SIZE]) -> Self {
        Self {
            length: LittleEndian::read_u32(&bytes[0..4]),
            kind: LittleEndian::read_u32(&bytes[4..8]),
        }
    }
}

/// Container header with the JSON chunk sub-header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlbHeader {
    pub magic: u32,
    pub version: u32,
    /// Total declared container length, headers included.
    pub length: u32,
    pub json: ChunkHeader,
}

impl GlbHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        LittleEndian::write_u32(&mut out[0..4], self.magic);
        LittleEndian::write_u32(&mut out[4..8], self.version);
        LittleEndian::write_u32(&mut out[8..12], self.length);
        out[12..20].copy_from_slice(&self.json.to_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let mut json = [0u8; CHUNK_HEADER_SIZE];
        json.copy_from_slice(&bytes[12..20]);
        Self {
            magic: LittleEndian::read_u32(&bytes[0..4]),
            version: LittleEndian::read_u32(&bytes[4..8]),
            length: LittleEndian::read_u32(&bytes[8..12]),
            json: ChunkHeader::from_bytes(&json),
        }
    }

    #[inline]
    pub fn has_magic(&self) -> bool {
        self.magic == GLB_MAGIC
    }

    /// Bytes declared after the JSON chunk payload.
    ///
    /// None when the JSON chunk claims more than the declared total.
    pub fn remaining_after_json(&self) -> Option<u64> {
        (self.length as u64).checked_sub(HEADER_SIZE as u64 + self.json.length as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_is_ascii() {
        assert_eq!(&GLB_MAGIC.to_le_bytes(), b"glTF");
        assert_eq!(&CHUNK_JSON.to_le_bytes(), b"JSON");
        assert_eq!(&CHUNK_BIN.to_le_bytes(), b"BIN\0");
    }

    #[test]
    fn test_header_bytes() {
        let h = GlbHeader {
            magic: GLB_MAGIC,
            version: 2,
            length: 120,
            json: ChunkHeader::new(64, CHUNK_JSON),
        };
        let bytes = h.to_bytes();
        assert_eq!(&bytes[0..4], b"glTF");
        assert_eq!(&bytes[4..8], &[2, 0, 0, 0]);
        assert_eq!(&bytes[16..20], b"JSON");
        assert_eq!(GlbHeader::from_bytes(&bytes), h);
        assert_eq!(h.remaining_after_json(), Some(36));
    }

    #[test]
    fn test_inconsistent_lengths() {
        let h = GlbHeader { magic: GLB_MAGIC, version: 2, length: 30, json: ChunkHeader::new(64, CHUNK_JSON) };
        assert_eq!(h.remaining_after_json(), None);
    }

    #[test]
    fn test_variant_chunk_types() {
        assert!(ContainerVariant::Legacy.accepts_json_chunk(0));
        assert!(ContainerVariant::Legacy.accepts_json_chunk(CHUNK_JSON));
        assert!(!ContainerVariant::Dual.accepts_json_chunk(0));
        assert!(!ContainerVariant::Dual.accepts_json_chunk(CHUNK_BIN));
        assert_eq!(ContainerVariant::from_version(3), None);
    }
}
