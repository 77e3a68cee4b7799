//! JSON description types.
//!
//! Every field name follows the wire format (camelCase). Buffer payloads are
//! referenced by buffer-view name; decoded geometry and pixels hang off the
//! owning type in `#[serde(skip)]` fields.

use serde::{Deserialize, Serialize};

use crate::geom::{EncodedGeometry, MeshData, PolylineData, QParams2d, QParams3d, SurfaceType, RANGE_SCALE_16};
use crate::texture::{TextureFormat, TextureImage};
use crate::util::{compute_dimensions, Error, Range2d, Range3d, Result};

fn is_zero(v: &u32) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// How feature ids are stored for a vertex table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum FeatureIndexType {
    #[default]
    Empty = 0,
    Uniform = 1,
    NonUniform = 2,
}

impl TryFrom<u32> for FeatureIndexType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Empty),
            1 => Ok(Self::Uniform),
            2 => Ok(Self::NonUniform),
            other => Err(Error::invalid(format!("unknown feature index type {}", other))),
        }
    }
}

impl From<FeatureIndexType> for u32 {
    fn from(t: FeatureIndexType) -> u32 {
        t as u32
    }
}

/// Numeric primitive discriminator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PrimitiveType {
    Mesh = 0,
    Polyline = 1,
    Point = 2,
}

impl TryFrom<u32> for PrimitiveType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Mesh),
            1 => Ok(Self::Polyline),
            2 => Ok(Self::Point),
            other => Err(Error::invalid(format!("unknown primitive type {}", other))),
        }
    }
}

impl From<PrimitiveType> for u32 {
    fn from(t: PrimitiveType) -> u32 {
        t as u32
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialAtlas {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub num_materials: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_translucency: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides_alpha: Option<bool>,
}

/// Dequantization params of a vertex table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeParams {
    #[serde(default)]
    pub decode_matrix: Vec<f32>,
    #[serde(default)]
    pub decoded_min: Vec<f32>,
    #[serde(default)]
    pub decoded_max: Vec<f32>,
}

/// Description of a packed vertex table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexTable {
    #[serde(default)]
    pub buffer_view: String,
    /// Number of vertex records. When absent it is derived from the view length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default)]
    pub num_rgba_per_vertex: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_colors: Option<u32>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub has_translucency: bool,
    #[serde(default)]
    pub feature_index_type: FeatureIndexType,
    #[serde(default, rename = "featureID", skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<u32>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub uniform_color: u32,
    #[serde(default)]
    pub params: DecodeParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_atlas: Option<MaterialAtlas>,
}

impl VertexTable {
    /// Position params rebuilt from `decodedMin` / `decodedMax`.
    pub fn pos_params(&self) -> Result<QParams3d> {
        let range = Range3d::from_slices(&self.params.decoded_min, &self.params.decoded_max).ok_or_else(|| {
            Error::invalid(format!(
                "vertex table '{}' needs 3-component decodedMin/decodedMax",
                self.buffer_view
            ))
        })?;
        Ok(QParams3d::from_range(&range, RANGE_SCALE_16))
    }

    /// Record the layout and params of freshly encoded geometry.
    pub fn apply_encoding(&mut self, enc: &EncodedGeometry) -> Result<()> {
        let rgba_per_vertex = enc.layout.rgba_per_vertex();
        let dims = compute_dimensions(enc.vertex_count, rgba_per_vertex, enc.num_colors)?;
        let range = enc.pos_params.range();
        self.params = DecodeParams {
            decode_matrix: enc.pos_params.decode_matrix().to_vec(),
            decoded_min: range.low.to_array().to_vec(),
            decoded_max: range.high.to_array().to_vec(),
        };
        self.count = Some(enc.vertex_count);
        self.num_rgba_per_vertex = rgba_per_vertex;
        self.num_colors = (enc.num_colors > 0).then_some(enc.num_colors);
        self.width = dims.width;
        self.height = dims.height;
        Ok(())
    }
}

/// Range of the quantized uvs of a surface.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UvParams {
    pub decoded_min: Vec<f32>,
    pub decoded_max: Vec<f32>,
}

impl From<&QParams2d> for UvParams {
    fn from(q: &QParams2d) -> Self {
        let range = q.range();
        Self {
            decoded_min: range.low.to_array().to_vec(),
            decoded_max: range.high.to_array().to_vec(),
        }
    }
}

/// Mesh surface: type tag, index view and uv range.
///
/// The type tag is kept numeric so that a document with an unknown surface
/// type still parses; [`Surface::surface_type`] validates it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Surface {
    #[serde(rename = "type", default)]
    pub kind: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub indices: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_display_texture: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv_params: Option<UvParams>,
}

impl Surface {
    pub fn new(surface: SurfaceType) -> Self {
        Self { kind: surface.as_u32(), ..Default::default() }
    }

    #[inline]
    pub fn surface_type(&self) -> Result<SurfaceType> {
        SurfaceType::from_u32(self.kind)
    }

    /// Uv params, if the surface declares a uv range.
    pub fn uv_params(&self) -> Result<Option<QParams2d>> {
        let Some(uv) = &self.uv_params else {
            return Ok(None);
        };
        let range = Range2d::from_slices(&uv.decoded_min, &uv.decoded_max)
            .ok_or_else(|| Error::invalid("uvParams needs 2-component decodedMin/decodedMax"))?;
        Ok(Some(QParams2d::from_range(&range, RANGE_SCALE_16)))
    }
}

/// Instancing tables; every string is a buffer-view name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instances {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transform_center: Vec<f32>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feature_ids: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub transforms: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub symbology_overrides: String,
}

/// Fields shared by every primitive kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveBase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default)]
    pub vertices: VertexTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_planar: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_independent_origin: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<Instances>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEdges {
    pub indices: String,
    pub end_point_and_quad_indices: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SilhouetteEdges {
    pub indices: String,
    pub end_point_and_quad_indices: String,
    pub normal_pairs: String,
}

/// Buffer views of a polyline's index streams.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolylineIndices {
    #[serde(default)]
    pub indices: String,
    #[serde(default)]
    pub prev_indices: String,
    #[serde(default)]
    pub next_indices_and_params: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshEdges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<SegmentEdges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silhouettes: Option<SilhouetteEdges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polylines: Option<PolylineIndices>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxChannel {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<u32>,
    #[serde(default)]
    pub indices: Vec<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantizedAuxChannel {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<u32>,
    #[serde(default)]
    pub indices: Vec<u32>,
    #[serde(default)]
    pub q_origin: Vec<f32>,
    #[serde(default)]
    pub q_scale: Vec<f32>,
}

/// Auxiliary per-vertex channels (displacements, normals, params).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxChannelTable {
    pub buffer_view: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub num_bytes_per_vertex: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub displacements: Vec<QuantizedAuxChannel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normals: Vec<AuxChannel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<QuantizedAuxChannel>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeJson {
    pub low: [f32; 3],
    pub high: [f32; 3],
}

/// Pattern fill of a planar region by a repeated symbol.
///
/// Clip geometry is kept as raw JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AreaPattern {
    pub symbol_name: String,
    pub clip: serde_json::Value,
    pub scale: f32,
    pub spacing: [f32; 2],
    pub org_transform: Vec<f32>,
    pub origin: [f32; 2],
    pub xy_offsets: String,
    pub feature_id: u32,
    pub model_transform: Vec<f32>,
    pub range: RangeJson,
    pub symbol_translation: [f32; 3],
    pub view_independent_origin: Option<[f32; 3]>,
}

/// Triangle mesh primitive (`type: 0`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshPrimitive {
    #[serde(flatten)]
    pub base: PrimitiveBase,
    #[serde(default)]
    pub surface: Surface,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<MeshEdges>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aux_channels: Option<AuxChannelTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_pattern: Option<AreaPattern>,
    #[serde(skip)]
    pub data: Option<MeshData>,
}

impl MeshPrimitive {
    /// Primitive carrying float geometry; views are assigned on encode.
    pub fn new(data: MeshData) -> Self {
        Self {
            surface: Surface::new(data.surface),
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.base.material = Some(material.into());
        self
    }
}

/// Polyline primitive (`type: 1`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolylinePrimitive {
    #[serde(flatten)]
    pub base: PrimitiveBase,
    #[serde(flatten)]
    pub polyline: PolylineIndices,
    #[serde(skip)]
    pub data: Option<PolylineData>,
}

impl PolylinePrimitive {
    pub fn new(data: PolylineData) -> Self {
        Self { data: Some(data), ..Default::default() }
    }
}

/// Point string primitive (`type: 2`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointStringPrimitive {
    #[serde(flatten)]
    pub base: PrimitiveBase,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub indices: String,
    #[serde(skip)]
    pub data: Option<PolylineData>,
}

impl PointStringPrimitive {
    pub fn new(data: PolylineData) -> Self {
        Self { data: Some(data), ..Default::default() }
    }
}

/// A texture stored in the blob.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTexture {
    #[serde(default)]
    pub buffer_view: String,
    #[serde(default)]
    pub format: TextureFormat,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub is_glyph: bool,
    #[serde(default)]
    pub is_tile_section: bool,
    #[serde(skip)]
    pub image: Option<TextureImage>,
}

impl RenderTexture {
    /// Texture built from pixels, encoded as `format` on save.
    pub fn from_image(format: TextureFormat, image: TextureImage) -> Self {
        Self {
            format,
            width: image.width,
            height: image.height,
            image: Some(image),
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum TextureMappingMode {
    #[default]
    None = -1,
    Parametric = 0,
    ElevationDrape = 1,
    Planar = 2,
    DirectionalDrape = 3,
    Cubic = 4,
    Spherical = 5,
    Cylindrical = 6,
    Solid = 7,
    FrontProject = 8,
}

impl TryFrom<i32> for TextureMappingMode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            -1 => Self::None,
            0 => Self::Parametric,
            1 => Self::ElevationDrape,
            2 => Self::Planar,
            3 => Self::DirectionalDrape,
            4 => Self::Cubic,
            5 => Self::Spherical,
            6 => Self::Cylindrical,
            7 => Self::Solid,
            8 => Self::FrontProject,
            other => return Err(Error::invalid(format!("unknown texture mapping mode {}", other))),
        })
    }
}

impl From<TextureMappingMode> for i32 {
    fn from(m: TextureMappingMode) -> i32 {
        m as i32
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureParams {
    #[serde(default)]
    pub mode: TextureMappingMode,
    #[serde(default)]
    pub transform: Vec<[f64; 3]>,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub world_mapping: bool,
}

/// Reference from a material to a named texture.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    #[serde(default)]
    pub params: TextureParams,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextureMapping {
    pub texture: Texture,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderMaterial {
    pub ambient: f32,
    pub diffuse: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diffuse_color: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emissive_color: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    pub reflect: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflect_color: Option<[f32; 3]>,
    pub refract: f32,
    pub shadows: bool,
    pub specular: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specular_color: Option<[f32; 3]>,
    pub specular_exponent: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparency: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture_mapping: Option<TextureMapping>,
}

/// Symbology material referenced by primitives.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Material {
    pub category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_flags: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_lighting: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_pixels: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_width: Option<u32>,
    pub material_id: String,
    pub sub_category_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture: Option<Texture>,
    #[serde(rename = "type")]
    pub kind: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub animation_nodes: Vec<String>,
}

/// Per-vertex animation node ids, stored in a buffer view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationNodes {
    pub buffer_view: String,
    pub bytes_per_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vertex;
    use crate::util::Vec3;

    #[test]
    fn test_vertex_table_json() -> Result<()> {
        let json = r#"{
            "bufferView": "bvVertex",
            "count": 3,
            "numRgbaPerVertex": 4,
            "width": 12,
            "height": 1,
            "hasTranslucency": false,
            "featureIndexType": 1,
            "featureID": 7,
            "params": {"decodeMatrix": [], "decodedMin": [0, 0, 0], "decodedMax": [1, 2, 0]}
        }"#;
        let vt: VertexTable = serde_json::from_str(json)?;
        assert_eq!(vt.feature_index_type, FeatureIndexType::Uniform);
        assert_eq!(vt.feature_id, Some(7));
        assert_eq!(vt.num_colors, None);

        let q = vt.pos_params()?;
        assert_eq!(q.origin, Vec3::ZERO);
        assert_eq!(q.scale.z, 0.0);
        assert!((q.scale.y - 65535.0 / 2.0).abs() < 1e-3);

        let out = serde_json::to_value(&vt)?;
        assert_eq!(out["featureID"], 7);
        assert!(out.get("uniformColor").is_none());
        assert!(out.get("numColors").is_none());
        Ok(())
    }

    #[test]
    fn test_bad_decode_range() {
        let vt = VertexTable {
            params: DecodeParams { decoded_min: vec![0.0, 0.0], decoded_max: vec![1.0, 1.0], ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(vt.pos_params(), Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn test_surface_type_tag() -> Result<()> {
        let s: Surface = serde_json::from_str(r#"{"type": 9, "indices": "idx"}"#)?;
        assert!(matches!(s.surface_type(), Err(Error::UnsupportedSurfaceType(9))));
        assert_eq!(s.uv_params()?, None);

        let s: Surface =
            serde_json::from_str(r#"{"type": 2, "uvParams": {"decodedMin": [0, 0], "decodedMax": [1, 1]}}"#)?;
        assert_eq!(s.surface_type()?, SurfaceType::Textured);
        assert!(s.uv_params()?.is_some());
        Ok(())
    }

    #[test]
    fn test_apply_encoding() -> Result<()> {
        let mut mesh = MeshData::new(SurfaceType::Unlit);
        mesh.vertices = vec![Vertex::new(Vec3::ZERO), Vertex::new(Vec3::ONE)];
        mesh.indices = vec![0, 1, 1];
        let enc = mesh.encode()?;

        let mut vt = VertexTable::default();
        vt.apply_encoding(&enc)?;
        assert_eq!(vt.count, Some(2));
        assert_eq!(vt.num_rgba_per_vertex, 3);
        assert_eq!((vt.width, vt.height), (6, 1));
        assert_eq!(vt.params.decoded_min, vec![0.0, 0.0, 0.0]);
        assert_eq!(vt.params.decoded_max, vec![1.0, 1.0, 1.0]);
        assert_eq!(vt.params.decode_matrix.len(), 16);
        Ok(())
    }

    #[test]
    fn test_flattened_primitive() -> Result<()> {
        let json = r#"{"type": 1, "material": "m0", "vertices": {"bufferView": "v", "count": 2},
                      "indices": "i", "prevIndices": "p", "nextIndicesAndParams": "n"}"#;
        let p: PolylinePrimitive = serde_json::from_str(json)?;
        assert_eq!(p.base.material.as_deref(), Some("m0"));
        assert_eq!(p.base.vertices.count, Some(2));
        assert_eq!(p.polyline.prev_indices, "p");
        Ok(())
    }
}
