//! # imdl
//!
//! Codec for the imdl scene-tile format: a JSON scene description whose
//! vertex, index and texture payloads are quantized, packed into one blob and
//! addressed by named buffer views, optionally wrapped in a glTF-style binary
//! container.
//!
//! ## Modules
//!
//! - [`util`] - Errors, ranges, lookup-texture dimensions
//! - [`geom`] - Quantization, index and vertex packing, geometry containers
//! - [`chunk`] - Buffers, buffer views and blob assembly
//! - [`glb`] - Binary container framing (versions 1 and 2)
//! - [`document`] - JSON description model
//! - [`texture`] - Texture formats and pluggable pixel codecs
//! - [`io`] - Stream and path decoding / encoding
//!
//! ## Example
//!
//! ```ignore
//! use imdl::prelude::*;
//!
//! let mut doc = imdl::open("tile.imdl")?;
//! println!("{} primitives", doc.primitive_count());
//! imdl::save_binary(&mut doc, "copy.imdl")?;
//! ```

pub mod chunk;
pub mod document;
pub mod geom;
pub mod glb;
pub mod io;
pub mod texture;
pub mod util;

// Re-export commonly used types
pub use document::Document;
pub use glb::DecodeLimits;
pub use io::{open, open_with, save, save_binary, save_with, Decoder, Encoder};
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::document::*;
    pub use crate::geom::{MeshData, PointStringData, PolylineData, Rgba, SurfaceType, Vertex};
    pub use crate::glb::DecodeLimits;
    pub use crate::io::{Decoder, Encoder, RelativeFileHandler, ResourceReader, ResourceWriter};
    pub use crate::texture::{CodecRegistry, TextureCodec, TextureFormat, TextureImage};
    pub use crate::util::{Error, Result, Vec2, Vec3};
}
