//! Fixed-stride vertex records.
//!
//! Each surface type selects one [`VertexLayout`]. Records are always written
//! at full stride; optional fields that are absent are zero-filled so that
//! `vertex_count == byte_length / stride` holds for every table.
//!
//! ```text
//! Simple       (12) qpos.x qpos.y qpos.z colorIndex featureIndex
//! Lit          (16) qpos.x qpos.y qpos.z colorIndex featureIndex normal pad
//! Textured     (16) qpos.x qpos.y qpos.z pad        featureIndex u v
//! TexturedLit  (16) qpos.x qpos.y qpos.z normal     featureIndex u v
//! ```

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use super::color::{pack_color, Rgba};
use crate::util::{Error, Result};

/// Surface type tag carried by mesh primitives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SurfaceType {
    #[default]
    Unlit = 0,
    Lit = 1,
    Textured = 2,
    TexturedLit = 3,
    VolumeClassifier = 4,
}

impl SurfaceType {
    /// Parse a numeric surface type tag.
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Unlit),
            1 => Ok(Self::Lit),
            2 => Ok(Self::Textured),
            3 => Ok(Self::TexturedLit),
            4 => Ok(Self::VolumeClassifier),
            other => Err(Error::UnsupportedSurfaceType(other)),
        }
    }

    #[inline]
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// Vertex record layout for this surface type.
    #[inline]
    pub fn layout(self) -> VertexLayout {
        VertexLayout::for_surface(self)
    }

    /// Check if this surface carries texture coordinates.
    #[inline]
    pub fn is_textured(self) -> bool {
        matches!(self, Self::Textured | Self::TexturedLit)
    }

    /// Check if this surface carries normals.
    #[inline]
    pub fn is_lit(self) -> bool {
        matches!(self, Self::Lit | Self::TexturedLit)
    }
}

impl TryFrom<u32> for SurfaceType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::from_u32(value)
    }
}

impl From<SurfaceType> for u32 {
    fn from(st: SurfaceType) -> u32 {
        st.as_u32()
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unlit => "unlit",
            Self::Lit => "lit",
            Self::Textured => "textured",
            Self::TexturedLit => "textured-lit",
            Self::VolumeClassifier => "volume-classifier",
        };
        f.write_str(name)
    }
}

/// Byte layout of one vertex record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// Position, color index, feature index.
    Simple,
    /// Simple plus a normal and two pad bytes.
    Lit,
    /// Position, pad, feature index, uv.
    Textured,
    /// Position, normal, feature index, uv.
    TexturedLit,
}

impl VertexLayout {
    /// Select the layout for a surface type.
    pub const fn for_surface(st: SurfaceType) -> Self {
        match st {
            SurfaceType::Unlit | SurfaceType::VolumeClassifier => Self::Simple,
            SurfaceType::Lit => Self::Lit,
            SurfaceType::Textured => Self::Textured,
            SurfaceType::TexturedLit => Self::TexturedLit,
        }
    }

    /// Record size in bytes.
    #[inline]
    pub const fn stride(self) -> usize {
        match self {
            Self::Simple => 12,
            Self::Lit | Self::Textured | Self::TexturedLit => 16,
        }
    }

    /// Record size in RGBA texels.
    #[inline]
    pub const fn rgba_per_vertex(self) -> u32 {
        (self.stride() / 4) as u32
    }

    #[inline]
    pub const fn has_color_index(self) -> bool {
        matches!(self, Self::Simple | Self::Lit)
    }

    #[inline]
    pub const fn has_normal(self) -> bool {
        matches!(self, Self::Lit | Self::TexturedLit)
    }

    #[inline]
    pub const fn has_uv(self) -> bool {
        matches!(self, Self::Textured | Self::TexturedLit)
    }
}

/// Quantized position with optional color table and feature indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimpleVertex {
    pub qpos: [u16; 3],
    pub color_index: Option<u16>,
    pub feature_index: Option<u32>,
}

impl SimpleVertex {
    pub fn new(qpos: [u16; 3]) -> Self {
        Self { qpos, ..Default::default() }
    }
}

/// Mesh vertex: a [`SimpleVertex`] plus quantized uv and encoded normal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshVertex {
    pub base: SimpleVertex,
    pub quv: Option<[u16; 2]>,
    pub normal: Option<u16>,
}

impl MeshVertex {
    pub fn new(qpos: [u16; 3]) -> Self {
        Self { base: SimpleVertex::new(qpos), ..Default::default() }
    }
}

impl From<SimpleVertex> for MeshVertex {
    fn from(base: SimpleVertex) -> Self {
        Self { base, ..Default::default() }
    }
}

/// Appends vertex records to a growing byte buffer.
pub struct VertexWriter {
    layout: VertexLayout,
    data: Vec<u8>,
}

impl VertexWriter {
    /// Create a writer with room for `capacity` vertices.
    pub fn new(layout: VertexLayout, capacity: usize) -> Self {
        Self { layout, data: Vec::with_capacity(capacity * layout.stride()) }
    }

    #[inline]
    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    /// Number of complete records written so far.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.data.len() / self.layout.stride()
    }

    #[inline]
    pub fn append_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    #[inline]
    pub fn append_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn append_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a straight-alpha color in its stored form.
    pub fn append_color(&mut self, color: Rgba) {
        self.data.extend_from_slice(&pack_color(color).to_bytes());
    }

    #[inline]
    fn skip(&mut self, n: usize) {
        self.data.resize(self.data.len() + n, 0);
    }

    fn append_qpos(&mut self, qpos: [u16; 3]) {
        for c in qpos {
            self.append_u16(c);
        }
    }

    fn append_opt_u16(&mut self, value: Option<u16>) {
        match value {
            Some(v) => self.append_u16(v),
            None => self.skip(2),
        }
    }

    fn append_opt_u32(&mut self, value: Option<u32>) {
        match value {
            Some(v) => self.append_u32(v),
            None => self.skip(4),
        }
    }

    fn append_uv(&mut self, quv: Option<[u16; 2]>) {
        match quv {
            Some([u, v]) => {
                self.append_u16(u);
                self.append_u16(v);
            }
            None => self.skip(4),
        }
    }

    /// Append one record.
    ///
    /// Fields the layout does not carry are ignored.
    pub fn append(&mut self, v: &MeshVertex) {
        let b = &v.base;
        self.append_qpos(b.qpos);
        match self.layout {
            VertexLayout::Simple => {
                self.append_opt_u16(b.color_index);
                self.append_opt_u32(b.feature_index);
            }
            VertexLayout::Lit => {
                self.append_opt_u16(b.color_index);
                self.append_opt_u32(b.feature_index);
                self.append_opt_u16(v.normal);
                self.skip(2);
            }
            VertexLayout::Textured => {
                self.skip(2);
                self.append_opt_u32(b.feature_index);
                self.append_uv(v.quv);
            }
            VertexLayout::TexturedLit => {
                self.append_opt_u16(v.normal);
                self.append_opt_u32(b.feature_index);
                self.append_uv(v.quv);
            }
        }
    }

    /// Append a polyline or point-string vertex.
    pub fn append_simple(&mut self, v: &SimpleVertex) {
        self.append(&MeshVertex::from(*v));
    }

    pub fn extend<'a, I: IntoIterator<Item = &'a MeshVertex>>(&mut self, vertices: I) {
        for v in vertices {
            self.append(v);
        }
    }

    /// Append a color table after the vertex records.
    pub fn append_color_table(&mut self, colors: &[Rgba]) {
        for &c in colors {
            self.append_color(c);
        }
    }

    /// Finish and return the packed bytes.
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// Forward-only cursor over packed vertex records.
///
/// Iteration stops after exactly `vertex_count` records; bytes past the last
/// record (a trailing color table, for instance) are never interpreted as
/// vertices.
pub struct VertexReader<'a> {
    layout: VertexLayout,
    data: &'a [u8],
    offset: usize,
    remaining: usize,
}

impl<'a> VertexReader<'a> {
    /// Cursor over every complete record in `data`.
    pub fn new(layout: VertexLayout, data: &'a [u8]) -> Self {
        Self { layout, data, offset: 0, remaining: data.len() / layout.stride() }
    }

    /// Cursor over the first `count` records.
    ///
    /// Fails if `data` is too short to hold them.
    pub fn with_count(layout: VertexLayout, data: &'a [u8], count: usize) -> Result<Self> {
        let needed = count as u64 * layout.stride() as u64;
        if needed > data.len() as u64 {
            return Err(Error::truncated("vertex table", needed, data.len() as u64));
        }
        Ok(Self { layout, data, offset: 0, remaining: count })
    }

    #[inline]
    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    /// Total number of records this cursor will yield.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.offset / self.layout.stride() + self.remaining
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.remaining > 0
    }

    /// Bytes following the last record.
    pub fn trailing(&self) -> &'a [u8] {
        let end = self.vertex_count() * self.layout.stride();
        &self.data[end..]
    }

    fn decode_at(&self, rec: &[u8]) -> MeshVertex {
        let u16_at = |o: usize| LittleEndian::read_u16(&rec[o..o + 2]);
        let u32_at = |o: usize| LittleEndian::read_u32(&rec[o..o + 4]);

        let base = SimpleVertex {
            qpos: [u16_at(0), u16_at(2), u16_at(4)],
            color_index: self.layout.has_color_index().then(|| u16_at(6)),
            feature_index: Some(u32_at(8)),
        };

        match self.layout {
            VertexLayout::Simple | VertexLayout::Lit => MeshVertex {
                base,
                quv: None,
                normal: self.layout.has_normal().then(|| u16_at(12)),
            },
            VertexLayout::Textured => MeshVertex {
                base,
                quv: Some([u16_at(12), u16_at(14)]),
                normal: None,
            },
            VertexLayout::TexturedLit => MeshVertex {
                base,
                quv: Some([u16_at(12), u16_at(14)]),
                normal: Some(u16_at(6)),
            },
        }
    }
}

impl Iterator for VertexReader<'_> {
    type Item = MeshVertex;

    fn next(&mut self) -> Option<MeshVertex> {
        if self.remaining == 0 {
            return None;
        }
        let stride = self.layout.stride();
        let rec = &self.data[self.offset..self.offset + stride];
        let v = self.decode_at(rec);
        self.offset += stride;
        self.remaining -= 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for VertexReader<'_> {}

/// Read `num_colors` stored colors from the bytes after the vertex records.
///
/// Colors are returned in stored (inverted-alpha, premultiplied) form.
pub fn decode_color_table(trailing: &[u8], num_colors: usize) -> Result<Vec<Rgba>> {
    let needed = num_colors as u64 * 4;
    if needed > trailing.len() as u64 {
        return Err(Error::truncated("color table", needed, trailing.len() as u64));
    }
    Ok(trailing[..num_colors * 4]
        .chunks_exact(4)
        .map(|c| Rgba::new(c[0], c[1], c[2], c[3]))
        .collect())
}
