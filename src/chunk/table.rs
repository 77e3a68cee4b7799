//! Named chunk table and blob assembly.

use std::collections::{BTreeMap, HashSet};

use tracing::trace;

use super::BufferView;

/// Default per-chunk alignment in the blob.
pub const DEFAULT_ALIGNMENT: usize = 8;

/// Default fill byte for chunk padding.
pub const DEFAULT_PAD_BYTE: u8 = 0x20;

/// Name of the buffer that holds the embedded blob.
pub const BINARY_BUFFER: &str = "binary_glTF";

/// Number of bytes needed to bring `offset` up to a multiple of `unit`.
#[inline]
pub fn padding_for(offset: usize, unit: usize) -> usize {
    if unit == 0 {
        return 0;
    }
    match offset % unit {
        0 => 0,
        r => unit - r,
    }
}

/// Pad `bytes` in place to a multiple of `unit` using `pad_byte`.
pub fn pad_to(bytes: &mut Vec<u8>, unit: usize, pad_byte: u8) {
    let n = padding_for(bytes.len(), unit);
    bytes.resize(bytes.len() + n, pad_byte);
}

/// One named payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkEntry {
    pub name: String,
    pub data: Vec<u8>,
}

impl ChunkEntry {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self { name: name.into(), data }
    }
}

/// Ordered set of uniquely named chunks that become one blob.
#[derive(Debug)]
pub struct ChunkTable {
    entries: Vec<ChunkEntry>,
    names: HashSet<String>,
    reserved: HashSet<String>,
    next_id: usize,
    alignment: usize,
    pad_byte: u8,
}

impl Default for ChunkTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkTable {
    pub fn new() -> Self {
        Self::with_alignment(DEFAULT_ALIGNMENT, DEFAULT_PAD_BYTE)
    }

    /// Table with custom alignment and fill byte. An alignment of 0 or 1
    /// disables padding.
    pub fn with_alignment(alignment: usize, pad_byte: u8) -> Self {
        Self {
            entries: Vec::new(),
            names: HashSet::new(),
            reserved: HashSet::new(),
            next_id: 0,
            alignment,
            pad_byte,
        }
    }

    fn synthesize_name(&mut self) -> String {
        loop {
            let name = format!("buffer-{}", self.next_id);
            self.next_id += 1;
            if !self.names.contains(&name) && !self.reserved.contains(&name) {
                return name;
            }
        }
    }

    /// Add a chunk and return the name it was stored under.
    ///
    /// A requested name is kept when it is non-empty and not yet taken;
    /// otherwise a fresh `buffer-N` name is generated.
    pub fn add(&mut self, name: Option<&str>, data: Vec<u8>) -> String {
        let name = match name {
            Some(n) if !n.is_empty() && !self.names.contains(n) => n.to_string(),
            Some(n) if !n.is_empty() => {
                let fresh = self.synthesize_name();
                trace!("chunk name '{}' already taken, using '{}'", n, fresh);
                fresh
            }
            _ => self.synthesize_name(),
        };
        self.names.insert(name.clone());
        self.entries.push(ChunkEntry { name: name.clone(), data });
        name
    }

    /// Keep `name` out of the generated `buffer-N` sequence.
    ///
    /// A reserved name can still be claimed by an explicit request.
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.reserved.insert(name.into());
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ChunkEntry] {
        &self.entries
    }

    /// Concatenate all chunks in insertion order, padding each one.
    ///
    /// Views reference `buffer` and record the unpadded length.
    pub fn finalize(self, buffer: &str) -> FinalizedBlob {
        let total: usize = self
            .entries
            .iter()
            .map(|e| e.data.len() + padding_for(e.data.len(), self.alignment))
            .sum();

        let mut blob = Vec::with_capacity(total);
        let mut views = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            let view = BufferView {
                buffer: buffer.to_string(),
                byte_offset: blob.len() as u64,
                byte_length: entry.data.len() as u64,
            };
            blob.extend_from_slice(&entry.data);
            pad_to(&mut blob, self.alignment, self.pad_byte);
            views.push((entry.name, view));
        }
        debug_assert_eq!(blob.len(), total);
        FinalizedBlob { blob, views }
    }
}

/// Result of [`ChunkTable::finalize`].
#[derive(Clone, Debug, Default)]
pub struct FinalizedBlob {
    pub blob: Vec<u8>,
    /// Views in blob order.
    pub views: Vec<(String, BufferView)>,
}

impl FinalizedBlob {
    /// Views keyed by name, as stored in JSON.
    pub fn view_map(&self) -> BTreeMap<String, BufferView> {
        self.views.iter().cloned().collect()
    }
}

/// Sub-range of `blob` for a named view.
///
/// Returns None if the name is absent or the range falls outside the blob.
pub fn slice<'a>(blob: &'a [u8], views: &BTreeMap<String, BufferView>, name: &str) -> Option<&'a [u8]> {
    let view = views.get(name)?;
    let (start, end) = view.range()?;
    blob.get(start..end)
}
