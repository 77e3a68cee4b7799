//! Container framing, limits and external buffers.

use std::fs;

use imdl::prelude::*;

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn sample_document() -> Document {
    let mesh = MeshData {
        surface: SurfaceType::Lit,
        indices: vec![0, 1, 2],
        vertices: vec![
            Vertex::new(Vec3::new(0.0, 0.0, 0.0)).with_normal(Vec3::Z),
            Vertex::new(Vec3::new(1.0, 0.0, 0.0)).with_normal(Vec3::Z),
            Vertex::new(Vec3::new(0.0, 1.0, 0.0)).with_normal(Vec3::Z),
        ],
        colors: vec![Rgba::rgb(200, 100, 50)],
    };
    let mut doc = Document::new();
    doc.insert_mesh("m0", Mesh::new(Primitives::Meshes(vec![MeshPrimitive::new(mesh)])));
    doc
}

/// Version 2 container bytes plus the JSON and BIN payloads found in it.
fn dual_parts() -> Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let mut doc = sample_document();
    let mut bytes = Vec::new();
    Encoder::new(&mut bytes).encode(&mut doc)?;

    let json_len = u32_at(&bytes, 12) as usize;
    let json = bytes[20..20 + json_len].to_vec();
    let bin_at = 20 + json_len;
    let bin_len = u32_at(&bytes, bin_at) as usize;
    let blob = bytes[bin_at + 8..bin_at + 8 + bin_len].to_vec();
    Ok((bytes, json, blob))
}

fn legacy_container(json: &[u8], blob: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&((20 + json.len() + blob.len()) as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(json);
    out.extend_from_slice(blob);
    out
}

#[test]
fn test_dual_layout() -> Result<()> {
    let (bytes, json, blob) = dual_parts()?;
    assert_eq!(u32_at(&bytes, 8) as usize, bytes.len());
    assert_eq!(u32_at(&bytes, 16), 0x4E4F_534A);
    assert_eq!(u32_at(&bytes, 20 + json.len() + 4), 0x004E_4942);
    assert_eq!(json.len() % 4, 0);
    assert_eq!(blob.len() % 4, 0);
    // JSON padding is spaces, so the chunk still parses.
    let value: serde_json::Value = serde_json::from_slice(&json)?;
    assert!(value["buffers"]["binary_glTF"]["byteLength"].as_u64().is_some());
    Ok(())
}

#[test]
fn test_legacy_decode() -> Result<()> {
    let (_, json, blob) = dual_parts()?;
    let legacy = legacy_container(&json, &blob);

    let doc = Decoder::new(&legacy[..]).decode()?;
    assert_eq!(doc.primitive_count(), 1);
    let Some(Primitives::Meshes(prims)) = &doc.meshes["m0"].primitives else {
        panic!("expected meshes");
    };
    let data = prims[0].data.clone().unwrap_or_default();
    assert_eq!(data.indices, vec![0, 1, 2]);
    assert_eq!(data.colors, vec![Rgba::rgb(200, 100, 50)]);
    assert!(data.vertices.iter().all(|v| v.normal.is_some()));
    Ok(())
}

#[test]
fn test_legacy_without_vertex_count() -> Result<()> {
    let (_, json, blob) = dual_parts()?;
    let mut value: serde_json::Value = serde_json::from_slice(&json)?;
    let vertices = &mut value["meshes"]["m0"]["primitives"][0]["vertices"];
    assert_eq!(vertices["count"], 3);
    if let Some(table) = vertices.as_object_mut() {
        table.remove("count");
    }
    let legacy = legacy_container(&serde_json::to_vec(&value)?, &blob);

    let doc = Decoder::new(&legacy[..]).decode()?;
    let Some(Primitives::Meshes(prims)) = &doc.meshes["m0"].primitives else {
        panic!("expected meshes");
    };
    assert_eq!(prims[0].base.vertices.count, None);
    let data = prims[0].data.clone().unwrap_or_default();
    assert_eq!(data.vertices.len(), 3);
    assert_eq!(data.colors, vec![Rgba::rgb(200, 100, 50)]);
    Ok(())
}

#[test]
fn test_plain_json_without_blob() -> Result<()> {
    let doc = Decoder::new(&br#"{"scene":"s","scenes":{"s":{"nodes":["n"]}}}"#[..]).decode()?;
    assert_eq!(doc.scene.as_deref(), Some("s"));
    assert!(doc.chunks().is_empty());
    Ok(())
}

#[test]
fn test_truncated_bin_chunk() -> Result<()> {
    let (bytes, _, _) = dual_parts()?;
    let cut = &bytes[..bytes.len() - 4];
    let err = Decoder::new(cut).decode().unwrap_err();
    assert!(matches!(err, Error::TruncatedChunk { .. }), "{}", err);
    Ok(())
}

#[test]
fn test_memory_quota() -> Result<()> {
    let (bytes, _, _) = dual_parts()?;
    let limits = DecodeLimits::default().with_max_memory_allocation(16);
    let err = Decoder::new(&bytes[..]).with_limits(limits).decode().unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { .. }), "{}", err);
    Ok(())
}

#[test]
fn test_declared_buffer_quota() {
    let json = br#"{"buffers":{"binary_glTF":{"byteLength":4000000}}}"#;
    let limits = DecodeLimits::default().with_max_memory_allocation(1_000_000);
    let err = Decoder::new(&json[..]).with_limits(limits).decode().unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { .. }), "{}", err);
}

#[test]
fn test_external_buffer_quota() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("a.bin"), [0u8; 4])?;
    fs::write(dir.path().join("b.bin"), [0u8; 4])?;
    let json = br#"{"buffers":{"a":{"byteLength":4,"uri":"a.bin"},"b":{"byteLength":4,"uri":"b.bin"}}}"#;

    let err = Decoder::new(&json[..])
        .with_limits(DecodeLimits::default().with_max_external_buffers(1))
        .with_read_handler(RelativeFileHandler::new(dir.path()))
        .decode()
        .unwrap_err();
    assert!(matches!(err, Error::QuotaExceeded { .. }), "{}", err);

    let doc = Decoder::new(&json[..])
        .with_limits(DecodeLimits::default().with_max_external_buffers(2))
        .with_read_handler(RelativeFileHandler::new(dir.path()))
        .decode()?;
    assert_eq!(doc.buffers.len(), 2);
    Ok(())
}

#[test]
fn test_escaping_uri_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let json = br#"{"buffers":{"b":{"byteLength":4,"uri":"../x.bin"}}}"#;
    let err = Decoder::new(&json[..])
        .with_read_handler(RelativeFileHandler::new(dir.path()))
        .decode()
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResourceUri(_)), "{}", err);
    Ok(())
}

#[test]
fn test_external_without_reader() {
    let json = br#"{"buffers":{"b":{"byteLength":4,"uri":"x.bin"}}}"#;
    let err = Decoder::new(&json[..]).decode().unwrap_err();
    assert!(matches!(err, Error::InvalidBufferReference(_)), "{}", err);
}

#[test]
fn test_short_external_buffer() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("short.bin"), [1u8, 2, 3])?;
    let json = br#"{"buffers":{"b":{"byteLength":16,"uri":"short.bin"}}}"#;
    let err = Decoder::new(&json[..])
        .with_read_handler(RelativeFileHandler::new(dir.path()))
        .decode()
        .unwrap_err();
    assert!(matches!(err, Error::TruncatedChunk { expected: 16, available: 3, .. }), "{}", err);
    Ok(())
}

#[test]
fn test_external_buffer_views() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("side.bin"), [1u8, 2, 3, 4, 5, 6, 7, 8])?;
    let json = br#"{
        "buffers": {"side": {"byteLength": 8, "uri": "side.bin"}},
        "bufferViews": {"v": {"buffer": "side", "byteOffset": 2, "byteLength": 4}}
    }"#;
    fs::write(dir.path().join("tile.json"), &json[..])?;

    let mut doc = imdl::open(dir.path().join("tile.json"))?;
    assert_eq!(doc.find_buffer("v"), Some(&[3u8, 4, 5, 6][..]));

    // Re-encoding inlines the external chunk into the embedded blob.
    let mut out = Vec::new();
    Encoder::new(&mut out).encode(&mut doc)?;
    assert!(doc.buffers.values().all(|b| b.uri.is_none()));
    let back = Decoder::new(&out[..]).decode()?;
    assert_eq!(back.find_buffer("v"), Some(&[3u8, 4, 5, 6][..]));
    Ok(())
}

#[test]
fn test_plain_json_needs_writer() {
    let mut doc = sample_document();
    let mut out = Vec::new();
    let err = Encoder::new(&mut out).as_binary(false).encode(&mut doc).unwrap_err();
    assert!(matches!(err, Error::InvalidDocument(_)), "{}", err);
}

#[test]
fn test_bad_blob_uri() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut doc = sample_document();
    let mut out = Vec::new();
    let err = Encoder::new(&mut out)
        .as_binary(false)
        .with_blob_uri("../escape.bin")
        .with_write_handler(RelativeFileHandler::new(dir.path()))
        .encode(&mut doc)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResourceUri(_)), "{}", err);
    Ok(())
}
