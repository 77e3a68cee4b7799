//! Scene description model.
//!
//! [`Document`] mirrors the JSON description one to one. After decoding, every
//! buffer view is also available as a named chunk ([`Document::find_buffer`])
//! and every primitive carries its float geometry in `data`. Encoding rebuilds
//! the blob from that geometry; chunks no primitive or texture regenerates are
//! carried over unchanged.

mod codec;
mod mesh;
mod types;

pub use mesh::*;
pub use types::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chunk::{Buffer, BufferView, ChunkEntry};

/// Name of the scene created by [`Document::new`].
pub const DEFAULT_SCENE: &str = "defaultScene";

/// Name of the root node of the default scene.
pub const ROOT_NODE: &str = "rootNode";

/// A decoded (or to-be-encoded) tile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gl_extensions_used: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub buffers: BTreeMap<String, Buffer>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub buffer_views: BTreeMap<String, BufferView>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub materials: BTreeMap<String, Material>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meshes: BTreeMap<String, Mesh>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nodes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scenes: BTreeMap<String, Scene>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub named_textures: BTreeMap<String, RenderTexture>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub render_materials: BTreeMap<String, RenderMaterial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_nodes: Option<AnimationNodes>,
    #[serde(skip)]
    chunks: Vec<ChunkEntry>,
}

impl Document {
    /// Empty document with a default scene holding a root node.
    pub fn new() -> Self {
        let scene = Scene {
            nodes: vec![ROOT_NODE.to_string()],
            ..Default::default()
        };
        Self {
            scene: Some(DEFAULT_SCENE.to_string()),
            scenes: BTreeMap::from([(DEFAULT_SCENE.to_string(), scene)]),
            ..Default::default()
        }
    }

    /// Bytes of a named chunk.
    pub fn find_buffer(&self, name: &str) -> Option<&[u8]> {
        self.chunks.iter().find(|c| c.name == name).map(|c| c.data.as_slice())
    }

    /// All chunks, in blob order.
    pub fn chunks(&self) -> &[ChunkEntry] {
        &self.chunks
    }

    /// Insert or replace a raw chunk, written as-is on the next encode.
    pub fn set_buffer(&mut self, name: impl Into<String>, data: Vec<u8>) {
        let name = name.into();
        match self.chunks.iter_mut().find(|c| c.name == name) {
            Some(chunk) => chunk.data = data,
            None => self.chunks.push(ChunkEntry::new(name, data)),
        }
    }

    /// Add a mesh under `name` and return the previous one, if any.
    pub fn insert_mesh(&mut self, name: impl Into<String>, mesh: Mesh) -> Option<Mesh> {
        self.meshes.insert(name.into(), mesh)
    }

    /// Total number of primitives across all meshes.
    pub fn primitive_count(&self) -> usize {
        self.meshes.values().map(Mesh::primitive_count).sum()
    }
}
