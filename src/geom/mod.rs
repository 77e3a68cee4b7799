//! Geometry packing.
//!
//! - [`quantize`] - range-based 16-bit quantization of positions and uvs
//! - [`indices`] - 24-bit packed triangle and line indices
//! - [`vertex`] - fixed-stride vertex records, one layout per surface type
//! - [`normal`] / [`color`] - octahedral normals and stored RGBA colors
//! - [`data`] - float-level mesh and polyline containers

pub mod color;
pub mod data;
pub mod indices;
pub mod normal;
pub mod quantize;
pub mod vertex;

pub use color::{pack_color, unpack_color, Rgba};
pub use data::{EncodedGeometry, MeshData, PackedGeometry, PointStringData, PolylineData, Vertex};
pub use indices::{decode_indices, encode_indices, INDEX_SIZE, MAX_INDEX};
pub use normal::{decode_normal, encode_normal};
pub use quantize::{
    is_quantizable, is_quantized, quantize, unquantize, QParams2d, QParams3d, RANGE_SCALE_16, RANGE_SCALE_8,
};
pub use vertex::{
    decode_color_table, MeshVertex, SimpleVertex, SurfaceType, VertexLayout, VertexReader, VertexWriter,
};
