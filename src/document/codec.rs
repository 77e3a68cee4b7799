//! Moving geometry and textures between the document and the chunk table.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, trace, warn};

use super::{Document, MeshPrimitive, PointStringPrimitive, PolylinePrimitive, PrimitiveBase, Primitives, RenderTexture};
use crate::chunk::{Buffer, BufferSet, ChunkTable, FinalizedBlob, BINARY_BUFFER};
use crate::geom::{EncodedGeometry, MeshData, PackedGeometry, PolylineData, QParams3d};
use crate::texture::CodecRegistry;
use crate::util::{Error, Result};

/// Resolve a view name, treating an empty name as an absent channel.
fn lookup<'a>(buffers: &'a BufferSet, name: &str) -> Result<Option<&'a [u8]>> {
    if name.is_empty() {
        return Ok(None);
    }
    let bytes = buffers.view(name)?;
    if bytes.is_none() {
        trace!("buffer view '{}' not in table, channel left empty", name);
    }
    Ok(bytes)
}

fn non_empty(name: &str) -> Option<&str> {
    (!name.is_empty()).then_some(name)
}

fn decode_mesh(p: &mut MeshPrimitive, buffers: &BufferSet) -> Result<()> {
    let surface = p.surface.surface_type()?;
    let vertices = lookup(buffers, &p.base.vertices.buffer_view)?;
    let packed = PackedGeometry {
        indices: lookup(buffers, &p.surface.indices)?,
        vertices,
        vertex_count: p.base.vertices.count,
        num_colors: p.base.vertices.num_colors.unwrap_or(0),
    };
    let pos = match vertices {
        Some(_) => p.base.vertices.pos_params()?,
        None => QParams3d::default(),
    };
    let uv = p.surface.uv_params()?;
    p.data = Some(MeshData::decode(surface, &packed, &pos, uv.as_ref())?);
    Ok(())
}

fn decode_lines(base: &PrimitiveBase, indices: &str, buffers: &BufferSet) -> Result<PolylineData> {
    let vertices = lookup(buffers, &base.vertices.buffer_view)?;
    let packed = PackedGeometry {
        indices: lookup(buffers, indices)?,
        vertices,
        vertex_count: base.vertices.count,
        num_colors: base.vertices.num_colors.unwrap_or(0),
    };
    let pos = match vertices {
        Some(_) => base.vertices.pos_params()?,
        None => QParams3d::default(),
    };
    PolylineData::decode(&packed, &pos)
}

/// Add the index and vertex chunks of one primitive and return their names.
fn add_geometry(
    table: &mut ChunkTable,
    enc: EncodedGeometry,
    indices: &str,
    vertices: &str,
) -> (String, String) {
    let indices = table.add(non_empty(indices), enc.indices);
    let vertices = table.add(non_empty(vertices), enc.vertices);
    (indices, vertices)
}

fn encode_mesh(p: &mut MeshPrimitive, table: &mut ChunkTable) -> Result<()> {
    let Some(data) = &p.data else {
        return Ok(());
    };
    let surface = data.surface;
    let enc = data.encode()?;

    p.surface.kind = surface.as_u32();
    p.surface.uv_params = enc.uv_params.as_ref().map(Into::into);
    p.base.vertices.apply_encoding(&enc)?;
    let (indices, vertices) = add_geometry(table, enc, &p.surface.indices, &p.base.vertices.buffer_view);
    p.surface.indices = indices;
    p.base.vertices.buffer_view = vertices;
    Ok(())
}

fn encode_polyline(p: &mut PolylinePrimitive, table: &mut ChunkTable) -> Result<()> {
    let Some(data) = &p.data else {
        return Ok(());
    };
    let enc = data.encode()?;
    p.base.vertices.apply_encoding(&enc)?;
    let (indices, vertices) = add_geometry(table, enc, &p.polyline.indices, &p.base.vertices.buffer_view);
    p.polyline.indices = indices;
    p.base.vertices.buffer_view = vertices;
    Ok(())
}

fn encode_points(p: &mut PointStringPrimitive, table: &mut ChunkTable) -> Result<()> {
    let Some(data) = &p.data else {
        return Ok(());
    };
    let enc = data.encode()?;
    p.base.vertices.apply_encoding(&enc)?;
    let (indices, vertices) = add_geometry(table, enc, &p.indices, &p.base.vertices.buffer_view);
    p.indices = indices;
    p.base.vertices.buffer_view = vertices;
    Ok(())
}

fn encode_texture(
    key: &str,
    tex: &mut RenderTexture,
    table: &mut ChunkTable,
    retained: &HashSet<String>,
    codecs: Option<&CodecRegistry>,
) -> Result<()> {
    let Some(image) = &tex.image else {
        return Ok(());
    };
    match codecs {
        Some(reg) => {
            let bytes = reg.encode(tex.format, image)?;
            tex.width = image.width;
            tex.height = image.height;
            tex.buffer_view = table.add(non_empty(&tex.buffer_view), bytes);
            Ok(())
        }
        None if retained.contains(&tex.buffer_view) => {
            debug!("texture '{}': no codecs, keeping encoded bytes", key);
            Ok(())
        }
        None => Err(Error::TextureCodec(format!(
            "texture '{}' has pixels but no codec registry was given",
            key
        ))),
    }
}

impl Document {
    /// Split loaded buffers into named chunks and decode every primitive.
    ///
    /// Textures are decoded to pixels only for formats `codecs` supports;
    /// the others keep just their encoded bytes.
    pub fn decode_chunk_data(&mut self, buffers: &BufferSet, codecs: Option<&CodecRegistry>) -> Result<()> {
        for (name, mesh) in &mut self.meshes {
            match &mut mesh.primitives {
                Some(Primitives::Meshes(prims)) => {
                    for p in prims {
                        decode_mesh(p, buffers)?;
                    }
                }
                Some(Primitives::Polylines(prims)) => {
                    for p in prims {
                        p.data = Some(decode_lines(&p.base, &p.polyline.indices, buffers)?);
                    }
                }
                Some(Primitives::PointStrings(prims)) => {
                    for p in prims {
                        p.data = Some(decode_lines(&p.base, &p.indices, buffers)?);
                    }
                }
                Some(Primitives::AreaPatterns(_)) | None => {}
            }
            trace!("decoded mesh '{}' ({} primitives)", name, mesh.primitive_count());
        }

        for (name, tex) in &mut self.named_textures {
            match codecs {
                Some(reg) if reg.supports(tex.format) => {
                    if let Some(bytes) = lookup(buffers, &tex.buffer_view)? {
                        tex.image = Some(reg.decode(tex.format, bytes)?);
                    }
                }
                Some(_) => warn!("no {} codec for texture '{}', keeping encoded bytes", tex.format, name),
                None => {}
            }
        }

        self.chunks = buffers.to_chunks()?;
        debug!(
            "decoded {} meshes, {} textures, {} chunks",
            self.meshes.len(),
            self.named_textures.len(),
            self.chunks.len()
        );
        Ok(())
    }

    /// Encode all geometry and textures into one blob.
    ///
    /// Primitive and texture view names are kept where possible and updated
    /// where a clash forced a new name. `buffers` and `bufferViews` are
    /// replaced by a single embedded buffer and its views. On error the
    /// document is left as it was.
    pub fn encode_chunk_data(&mut self, codecs: Option<&CodecRegistry>) -> Result<FinalizedBlob> {
        let mut table = ChunkTable::new();
        let retained: HashSet<String> = self.chunks.iter().map(|c| c.name.clone()).collect();
        for name in &retained {
            table.reserve(name.clone());
        }

        // Work on copies so a failure leaves the document untouched.
        let mut meshes = self.meshes.clone();
        let mut textures = self.named_textures.clone();

        for mesh in meshes.values_mut() {
            match &mut mesh.primitives {
                Some(Primitives::Meshes(prims)) => prims.iter_mut().try_for_each(|p| encode_mesh(p, &mut table))?,
                Some(Primitives::Polylines(prims)) => {
                    prims.iter_mut().try_for_each(|p| encode_polyline(p, &mut table))?
                }
                Some(Primitives::PointStrings(prims)) => {
                    prims.iter_mut().try_for_each(|p| encode_points(p, &mut table))?
                }
                Some(Primitives::AreaPatterns(_)) | None => {}
            }
        }

        for (key, tex) in &mut textures {
            encode_texture(key, tex, &mut table, &retained, codecs)?;
        }

        let mut passthrough = 0;
        for chunk in &self.chunks {
            if !table.contains(&chunk.name) {
                table.add(Some(&chunk.name), chunk.data.clone());
                passthrough += 1;
            }
        }

        self.meshes = meshes;
        self.named_textures = textures;
        self.chunks = table.entries().to_vec();
        let finalized = table.finalize(BINARY_BUFFER);
        debug!(
            "encoded {} chunks ({} passed through), blob {} bytes",
            finalized.views.len(),
            passthrough,
            finalized.blob.len()
        );

        self.buffers = BTreeMap::new();
        if !finalized.views.is_empty() {
            self.buffers
                .insert(BINARY_BUFFER.to_string(), Buffer::embedded(finalized.blob.len() as u64));
        }
        self.buffer_views = finalized.view_map();
        Ok(finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Mesh;
    use crate::geom::{Rgba, SurfaceType, Vertex};
    use crate::texture::{TextureFormat, TextureImage};
    use crate::util::{Vec2, Vec3};

    fn textured_triangle() -> MeshData {
        MeshData {
            surface: SurfaceType::Textured,
            indices: vec![0, 1, 2],
            vertices: vec![
                Vertex::new(Vec3::new(0.0, 0.0, 0.0)).with_uv(Vec2::new(0.0, 0.0)),
                Vertex::new(Vec3::new(1.0, 0.0, 0.0)).with_uv(Vec2::new(1.0, 0.0)),
                Vertex::new(Vec3::new(0.0, 1.0, 0.0)).with_uv(Vec2::new(0.0, 1.0)),
            ],
            colors: Vec::new(),
        }
    }

    fn buffer_set(doc: &Document, fin: &FinalizedBlob) -> BufferSet {
        let mut set = BufferSet::new(doc.buffer_views.clone());
        set.insert_buffer(BINARY_BUFFER, fin.blob.clone());
        set
    }

    #[test]
    fn test_mesh_roundtrip() -> Result<()> {
        let mut doc = Document::new();
        doc.insert_mesh("m0", Mesh::new(Primitives::Meshes(vec![MeshPrimitive::new(textured_triangle())])));

        let fin = doc.encode_chunk_data(None)?;
        assert_eq!(doc.buffers[BINARY_BUFFER].byte_length, fin.blob.len() as u64);
        assert_eq!(doc.buffer_views.len(), 2);

        let Some(Primitives::Meshes(prims)) = &doc.meshes["m0"].primitives else {
            panic!("expected meshes");
        };
        let p = &prims[0];
        assert_eq!(p.surface.indices, "buffer-0");
        assert_eq!(p.base.vertices.buffer_view, "buffer-1");
        assert_eq!(p.base.vertices.count, Some(3));
        assert_eq!(p.base.vertices.num_rgba_per_vertex, 4);
        assert!(p.surface.uv_params.is_some());

        let json = serde_json::to_vec(&doc)?;
        let mut back: Document = serde_json::from_slice(&json)?;
        back.decode_chunk_data(&buffer_set(&doc, &fin), None)?;

        let Some(Primitives::Meshes(prims)) = &back.meshes["m0"].primitives else {
            panic!("expected meshes");
        };
        let data = prims[0].data.as_ref().map(|d| (d.indices.clone(), d.vertices.clone()));
        let (indices, vertices) = data.unwrap_or_default();
        assert_eq!(indices, vec![0, 1, 2]);
        let original = textured_triangle();
        for (a, b) in vertices.iter().zip(&original.vertices) {
            assert!((a.position - b.position).abs().max_element() < 1e-4);
            let (ua, ub) = (a.uv.unwrap_or_default(), b.uv.unwrap_or_default());
            assert!((ua - ub).abs().max_element() < 1e-4);
        }
        Ok(())
    }

    #[test]
    fn test_name_clash_updates_reference() -> Result<()> {
        let mut a = MeshPrimitive::new(textured_triangle());
        a.surface.indices = "shared".into();
        let mut b = MeshPrimitive::new(textured_triangle());
        b.surface.indices = "shared".into();

        let mut doc = Document::new();
        doc.insert_mesh("m", Mesh::new(Primitives::Meshes(vec![a, b])));
        doc.encode_chunk_data(None)?;

        let Some(Primitives::Meshes(prims)) = &doc.meshes["m"].primitives else {
            panic!("expected meshes");
        };
        assert_eq!(prims[0].surface.indices, "shared");
        assert_ne!(prims[1].surface.indices, "shared");
        assert!(doc.buffer_views.contains_key(&prims[1].surface.indices));
        Ok(())
    }

    #[test]
    fn test_polyline_colors() -> Result<()> {
        let line = PolylineData {
            indices: vec![0, 1],
            vertices: vec![
                Vertex::new(Vec3::ZERO).with_color_index(0).with_feature_index(5),
                Vertex::new(Vec3::new(2.0, 0.0, 0.0)).with_color_index(1).with_feature_index(5),
            ],
            colors: vec![Rgba::new(255, 0, 0, 255), Rgba::new(0, 0, 255, 255)],
        };
        let mut doc = Document::new();
        doc.insert_mesh("l", Mesh::new(Primitives::Polylines(vec![PolylinePrimitive::new(line.clone())])));
        let fin = doc.encode_chunk_data(None)?;

        let Some(Primitives::Polylines(prims)) = &doc.meshes["l"].primitives else {
            panic!("expected polylines");
        };
        assert_eq!(prims[0].base.vertices.num_colors, Some(2));
        assert_eq!((prims[0].base.vertices.width, prims[0].base.vertices.height), (8, 1));

        let mut back: Document = serde_json::from_value(serde_json::to_value(&doc)?)?;
        back.decode_chunk_data(&buffer_set(&doc, &fin), None)?;
        let Some(Primitives::Polylines(prims)) = &back.meshes["l"].primitives else {
            panic!("expected polylines");
        };
        let decoded = prims[0].data.clone().unwrap_or_default();
        assert_eq!(decoded.colors, line.colors);
        assert_eq!(decoded.vertices[1].color_index, Some(1));
        assert_eq!(decoded.vertices[1].feature_index, Some(5));
        Ok(())
    }

    #[test]
    fn test_passthrough_chunks() -> Result<()> {
        let mut doc = Document::new();
        doc.set_buffer("bvAnim", vec![1, 0, 2, 0]);
        doc.insert_mesh("m", Mesh::new(Primitives::Meshes(vec![MeshPrimitive::new(textured_triangle())])));
        let fin = doc.encode_chunk_data(None)?;
        assert!(doc.buffer_views.contains_key("bvAnim"));

        let mut back: Document = serde_json::from_value(serde_json::to_value(&doc)?)?;
        back.decode_chunk_data(&buffer_set(&doc, &fin), None)?;
        assert_eq!(back.find_buffer("bvAnim"), Some(&[1u8, 0, 2, 0][..]));

        // Re-encoding keeps the chunk and does not duplicate regenerated ones.
        back.encode_chunk_data(None)?;
        assert_eq!(back.buffer_views.len(), 3);
        assert_eq!(back.find_buffer("bvAnim"), Some(&[1u8, 0, 2, 0][..]));
        Ok(())
    }

    #[test]
    fn test_unknown_surface_type() -> Result<()> {
        let mut doc: Document = serde_json::from_str(
            r#"{"meshes": {"m": {"primitives": [{"type": 0, "surface": {"type": 11}}]}}}"#,
        )?;
        let err = doc.decode_chunk_data(&BufferSet::default(), None).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSurfaceType(11)));
        Ok(())
    }

    #[test]
    fn test_missing_views_are_empty() -> Result<()> {
        let mut doc: Document = serde_json::from_str(
            r#"{"meshes": {"m": {"primitives": [{"type": 0, "surface": {"type": 1, "indices": "gone"},
                "vertices": {"bufferView": "alsoGone", "count": 0}}]}}}"#,
        )?;
        doc.decode_chunk_data(&BufferSet::default(), None)?;
        let Some(Primitives::Meshes(prims)) = &doc.meshes["m"].primitives else {
            panic!("expected meshes");
        };
        let data = prims[0].data.clone().unwrap_or_default();
        assert!(data.indices.is_empty() && data.vertices.is_empty());
        assert_eq!(data.surface, SurfaceType::Lit);
        Ok(())
    }

    #[test]
    fn test_texture_without_codec() {
        let mut doc = Document::new();
        doc.named_textures.insert(
            "t".into(),
            RenderTexture::from_image(TextureFormat::Png, TextureImage::filled(1, 1, [0, 0, 0, 255])),
        );
        assert!(matches!(doc.encode_chunk_data(None), Err(Error::TextureCodec(_))));
    }

    #[test]
    fn test_empty_document() -> Result<()> {
        let mut doc = Document::new();
        let fin = doc.encode_chunk_data(None)?;
        assert!(fin.blob.is_empty());
        assert!(doc.buffers.is_empty());
        assert!(doc.buffer_views.is_empty());
        Ok(())
    }

    #[test]
    fn test_failed_encode_leaves_document() -> Result<()> {
        let mut bad = textured_triangle();
        bad.indices = vec![0, 1, 1 << 24];

        let mut doc = Document::new();
        doc.insert_mesh("a", Mesh::new(Primitives::Meshes(vec![MeshPrimitive::new(textured_triangle())])));
        doc.insert_mesh("b", Mesh::new(Primitives::Meshes(vec![MeshPrimitive::new(bad)])));
        doc.set_buffer("kept", vec![1, 2, 3]);
        let before = doc.clone();

        let err = doc.encode_chunk_data(None).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index, .. } if index == 1 << 24));
        assert_eq!(doc, before);

        let Some(Primitives::Meshes(prims)) = &doc.meshes["a"].primitives else {
            panic!("expected meshes");
        };
        assert!(prims[0].surface.indices.is_empty());
        assert!(prims[0].base.vertices.buffer_view.is_empty());
        Ok(())
    }
}
