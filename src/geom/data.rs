//! Float-level geometry containers.
//!
//! These hold positions, uvs and normals as floats. [`MeshData::encode`] and
//! [`PolylineData::encode`] quantize against the geometry's own range and pack
//! indices and vertex records; the `decode` counterparts reverse the process
//! using params recovered from the JSON description.

use super::color::{unpack_color, Rgba};
use super::indices::{decode_indices, encode_indices};
use super::normal::{decode_normal, encode_normal};
use super::quantize::{QParams2d, QParams3d, RANGE_SCALE_16};
use super::vertex::{decode_color_table, MeshVertex, SimpleVertex, SurfaceType, VertexLayout, VertexReader, VertexWriter};
use crate::util::{Error, Range2d, Range3d, Result, Vec2, Vec3};

/// A single float-level vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub uv: Option<Vec2>,
    pub normal: Option<Vec3>,
    pub color_index: Option<u16>,
    pub feature_index: Option<u32>,
}

impl Vertex {
    pub fn new(position: Vec3) -> Self {
        Self { position, ..Default::default() }
    }

    pub fn with_uv(mut self, uv: Vec2) -> Self {
        self.uv = Some(uv);
        self
    }

    pub fn with_normal(mut self, normal: Vec3) -> Self {
        self.normal = Some(normal);
        self
    }

    pub fn with_color_index(mut self, index: u16) -> Self {
        self.color_index = Some(index);
        self
    }

    pub fn with_feature_index(mut self, index: u32) -> Self {
        self.feature_index = Some(index);
        self
    }
}

/// Packed output of one primitive's geometry.
#[derive(Clone, Debug)]
pub struct EncodedGeometry {
    /// 24-bit packed indices.
    pub indices: Vec<u8>,
    /// Vertex records followed by the color table.
    pub vertices: Vec<u8>,
    pub vertex_count: u32,
    pub num_colors: u32,
    pub layout: VertexLayout,
    pub pos_params: QParams3d,
    pub uv_params: Option<QParams2d>,
}

/// Packed input for decoding one primitive.
///
/// Missing channels are `None` and leave the corresponding data empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct PackedGeometry<'a> {
    pub indices: Option<&'a [u8]>,
    pub vertices: Option<&'a [u8]>,
    /// Declared vertex count; when absent every full record before the color
    /// table is read.
    pub vertex_count: Option<u32>,
    pub num_colors: u32,
}

/// Narrow a length to the `u32` the JSON tables store.
fn count_u32(what: &'static str, n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| Error::QuotaExceeded {
        what,
        requested: n as u64,
        limit: u32::MAX as u64,
    })
}

fn position_range<'a, I: IntoIterator<Item = &'a Vertex>>(vertices: I) -> Range3d {
    let range = Range3d::from_points(vertices.into_iter().map(|v| v.position));
    if range.is_empty() {
        Range3d::new(Vec3::ZERO, Vec3::ZERO)
    } else {
        range
    }
}

fn uv_range<'a, I: IntoIterator<Item = &'a Vertex>>(vertices: I) -> Option<Range2d> {
    let range = Range2d::from_points(vertices.into_iter().filter_map(|v| v.uv));
    (!range.is_empty()).then_some(range)
}

fn read_vertices<'a>(layout: VertexLayout, packed: &PackedGeometry<'a>) -> Result<(Vec<MeshVertex>, Vec<Rgba>)> {
    let Some(bytes) = packed.vertices else {
        return Ok((Vec::new(), Vec::new()));
    };
    let reader = match packed.vertex_count {
        Some(n) => VertexReader::with_count(layout, bytes, n as usize)?,
        None => {
            let table = packed.num_colors as usize * std::mem::size_of::<Rgba>();
            let n = bytes.len().saturating_sub(table) / layout.stride();
            VertexReader::with_count(layout, bytes, n)?
        }
    };
    let trailing = reader.trailing();
    let vertices: Vec<MeshVertex> = reader.collect();
    let colors = if packed.num_colors > 0 {
        decode_color_table(trailing, packed.num_colors as usize)?
            .into_iter()
            .map(unpack_color)
            .collect()
    } else {
        Vec::new()
    };
    Ok((vertices, colors))
}

fn read_indices(packed: &PackedGeometry<'_>) -> Result<Vec<u32>> {
    match packed.indices {
        Some(bytes) => decode_indices(bytes),
        None => Ok(Vec::new()),
    }
}

/// Triangle mesh geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub surface: SurfaceType,
    pub indices: Vec<u32>,
    pub vertices: Vec<Vertex>,
    /// Straight-alpha color table referenced by `color_index`.
    pub colors: Vec<Rgba>,
}

impl MeshData {
    pub fn new(surface: SurfaceType) -> Self {
        Self { surface, ..Default::default() }
    }

    /// Bounds of all positions (a zero range when there are no vertices).
    pub fn position_range(&self) -> Range3d {
        position_range(&self.vertices)
    }

    /// Bounds of all uvs, or None if no vertex has one.
    pub fn uv_range(&self) -> Option<Range2d> {
        uv_range(&self.vertices)
    }

    /// Quantize and pack this mesh.
    pub fn encode(&self) -> Result<EncodedGeometry> {
        let vertex_count = count_u32("vertex count", self.vertices.len())?;
        let num_colors = count_u32("color table length", self.colors.len())?;
        let layout = self.surface.layout();
        let pos_params = QParams3d::from_range(&self.position_range(), RANGE_SCALE_16);
        let uv_params = self.uv_range().map(|r| QParams2d::from_range(&r, RANGE_SCALE_16));

        let mut writer = VertexWriter::new(layout, self.vertices.len());
        for v in &self.vertices {
            writer.append(&MeshVertex {
                base: SimpleVertex {
                    qpos: pos_params.quantize_point(v.position),
                    color_index: v.color_index,
                    feature_index: v.feature_index,
                },
                quv: match (v.uv, &uv_params) {
                    (Some(uv), Some(q)) => Some(q.quantize_point(uv)),
                    _ => None,
                },
                normal: v.normal.map(encode_normal),
            });
        }
        writer.append_color_table(&self.colors);

        Ok(EncodedGeometry {
            indices: encode_indices(&self.indices)?,
            vertices: writer.finish(),
            vertex_count,
            num_colors,
            layout,
            pos_params,
            uv_params,
        })
    }

    /// Unpack and unquantize a mesh.
    pub fn decode(
        surface: SurfaceType,
        packed: &PackedGeometry<'_>,
        pos_params: &QParams3d,
        uv_params: Option<&QParams2d>,
    ) -> Result<Self> {
        let indices = read_indices(packed)?;
        let (records, colors) = read_vertices(surface.layout(), packed)?;

        let vertices = records
            .into_iter()
            .map(|r| Vertex {
                position: pos_params.unquantize_point(r.base.qpos),
                uv: match (r.quv, uv_params) {
                    (Some(q), Some(p)) => Some(p.unquantize_point(q)),
                    _ => None,
                },
                normal: r.normal.map(decode_normal),
                color_index: r.base.color_index,
                feature_index: r.base.feature_index,
            })
            .collect();

        Ok(Self { surface, indices, vertices, colors })
    }
}

/// Polyline geometry: positions with color and feature indices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolylineData {
    pub indices: Vec<u32>,
    pub vertices: Vec<Vertex>,
    pub colors: Vec<Rgba>,
}

/// Point strings share the polyline representation.
pub type PointStringData = PolylineData;

impl PolylineData {
    pub fn position_range(&self) -> Range3d {
        position_range(&self.vertices)
    }

    /// Quantize and pack. Uvs and normals are not stored for line geometry.
    pub fn encode(&self) -> Result<EncodedGeometry> {
        let vertex_count = count_u32("vertex count", self.vertices.len())?;
        let num_colors = count_u32("color table length", self.colors.len())?;
        let layout = VertexLayout::Simple;
        let pos_params = QParams3d::from_range(&self.position_range(), RANGE_SCALE_16);

        let mut writer = VertexWriter::new(layout, self.vertices.len());
        for v in &self.vertices {
            writer.append_simple(&SimpleVertex {
                qpos: pos_params.quantize_point(v.position),
                color_index: v.color_index,
                feature_index: v.feature_index,
            });
        }
        writer.append_color_table(&self.colors);

        Ok(EncodedGeometry {
            indices: encode_indices(&self.indices)?,
            vertices: writer.finish(),
            vertex_count,
            num_colors,
            layout,
            pos_params,
            uv_params: None,
        })
    }

    pub fn decode(packed: &PackedGeometry<'_>, pos_params: &QParams3d) -> Result<Self> {
        let indices = read_indices(packed)?;
        let (records, colors) = read_vertices(VertexLayout::Simple, packed)?;
        let vertices = records
            .into_iter()
            .map(|r| Vertex {
                position: pos_params.unquantize_point(r.base.qpos),
                color_index: r.base.color_index,
                feature_index: r.base.feature_index,
                ..Default::default()
            })
            .collect();
        Ok(Self { indices, vertices, colors })
    }
}
