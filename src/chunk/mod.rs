//! Buffer and buffer-view table.
//!
//! All packed payloads of a document live in one contiguous blob. Each
//! payload is addressed by a named [`BufferView`]: a byte range inside a named
//! [`Buffer`]. [`ChunkTable`] builds the blob on encode; [`BufferSet`] resolves
//! views against loaded buffers on decode.

mod table;

pub use table::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// A byte buffer declared in JSON.
///
/// A buffer without a `uri` is the embedded blob; others are external
/// resources resolved relative to the document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    pub byte_length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Buffer {
    /// Embedded buffer of the given length.
    pub fn embedded(byte_length: u64) -> Self {
        Self { byte_length, ..Default::default() }
    }

    /// External buffer stored at `uri`.
    pub fn external(uri: impl Into<String>, byte_length: u64) -> Self {
        Self { byte_length, uri: Some(uri.into()), ..Default::default() }
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.uri.is_some()
    }
}

/// Named byte range inside a buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    pub buffer: String,
    #[serde(default)]
    pub byte_offset: u64,
    pub byte_length: u64,
}

impl BufferView {
    /// `start..end` as usize, or None if the end overflows.
    pub fn range(&self) -> Option<(usize, usize)> {
        let start = usize::try_from(self.byte_offset).ok()?;
        let len = usize::try_from(self.byte_length).ok()?;
        Some((start, start.checked_add(len)?))
    }
}

/// Loaded buffers plus the view table that addresses them.
#[derive(Debug, Default)]
pub struct BufferSet {
    buffers: BTreeMap<String, Vec<u8>>,
    views: BTreeMap<String, BufferView>,
}

impl BufferSet {
    pub fn new(views: BTreeMap<String, BufferView>) -> Self {
        Self { buffers: BTreeMap::new(), views }
    }

    /// Register the bytes of a buffer.
    pub fn insert_buffer(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.buffers.insert(name.into(), data);
    }

    #[inline]
    pub fn has_buffer(&self, name: &str) -> bool {
        self.buffers.contains_key(name)
    }

    pub fn views(&self) -> &BTreeMap<String, BufferView> {
        &self.views
    }

    /// Resolve a view to its bytes.
    ///
    /// An unknown view name is not an error (the channel is simply absent).
    /// A view that names an unknown buffer, or whose range runs past the end of
    /// its buffer, is.
    pub fn view(&self, name: &str) -> Result<Option<&[u8]>> {
        let Some(view) = self.views.get(name) else {
            return Ok(None);
        };
        let buffer = self
            .buffers
            .get(&view.buffer)
            .ok_or_else(|| Error::InvalidBufferReference(format!("view '{}' -> buffer '{}'", name, view.buffer)))?;

        let expected = view.byte_offset.saturating_add(view.byte_length);
        let available = buffer.len() as u64;
        match view.range() {
            Some((start, end)) if expected <= available => Ok(Some(&buffer[start..end])),
            _ => Err(Error::truncated(name, expected, available)),
        }
    }

    /// Copy every view out as an owned chunk, ordered by buffer and offset.
    pub fn to_chunks(&self) -> Result<Vec<ChunkEntry>> {
        let mut ordered: Vec<(&String, &BufferView)> = self.views.iter().collect();
        ordered.sort_by(|a, b| (&a.1.buffer, a.1.byte_offset).cmp(&(&b.1.buffer, b.1.byte_offset)));

        let mut chunks = Vec::with_capacity(ordered.len());
        for (name, _) in ordered {
            if let Some(bytes) = self.view(name)? {
                chunks.push(ChunkEntry::new(name.clone(), bytes.to_vec()));
            }
        }
        Ok(chunks)
    }
}
