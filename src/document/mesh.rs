//! Meshes and their polymorphic primitive arrays.
//!
//! A mesh holds one array of primitives, all of the same kind. The kind is
//! read from the `type` field of the first element: a number selects mesh (0),
//! polyline (1) or point string (2); the string `"areaPattern"` selects area
//! patterns. The whole array is then decoded as that kind.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{AreaPattern, MeshPrimitive, PointStringPrimitive, PolylinePrimitive, PrimitiveType};

/// `type` value of area pattern primitives.
pub const AREA_PATTERN_TYPE: &str = "areaPattern";

/// Homogeneous primitive array of a mesh.
#[derive(Clone, Debug, PartialEq)]
pub enum Primitives {
    Meshes(Vec<MeshPrimitive>),
    Polylines(Vec<PolylinePrimitive>),
    PointStrings(Vec<PointStringPrimitive>),
    AreaPatterns(Vec<AreaPattern>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Typed(PrimitiveType),
    AreaPattern,
}

fn kind_of(value: &Value) -> Result<Kind, String> {
    match value.get("type") {
        Some(Value::String(s)) if s == AREA_PATTERN_TYPE => Ok(Kind::AreaPattern),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .and_then(|n| PrimitiveType::try_from(n).ok())
            .map(Kind::Typed)
            .ok_or_else(|| format!("unknown primitive type {}", n)),
        Some(other) => Err(format!("unknown primitive type {}", other)),
        None => Err("primitive has no type".to_string()),
    }
}

impl Primitives {
    /// Decode a raw JSON array. An empty array yields None.
    pub fn from_values(values: Vec<Value>) -> Result<Option<Self>, String> {
        let Some(first) = values.first() else {
            return Ok(None);
        };
        let kind = kind_of(first)?;
        if let Some(pos) = values.iter().position(|v| kind_of(v).ok() != Some(kind)) {
            return Err(format!("primitive {} does not match the type of primitive 0", pos));
        }

        let array = Value::Array(values);
        let parsed = match kind {
            Kind::Typed(PrimitiveType::Mesh) => serde_json::from_value(array).map(Self::Meshes),
            Kind::Typed(PrimitiveType::Polyline) => serde_json::from_value(array).map(Self::Polylines),
            Kind::Typed(PrimitiveType::Point) => serde_json::from_value(array).map(Self::PointStrings),
            Kind::AreaPattern => serde_json::from_value(array).map(Self::AreaPatterns),
        };
        parsed.map(Some).map_err(|e| e.to_string())
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Meshes(v) => v.len(),
            Self::Polylines(v) => v.len(),
            Self::PointStrings(v) => v.len(),
            Self::AreaPatterns(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the primitive kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Meshes(_) => "mesh",
            Self::Polylines(_) => "polyline",
            Self::PointStrings(_) => "point string",
            Self::AreaPatterns(_) => "area pattern",
        }
    }
}

/// Adds the `type` discriminator in front of a primitive's own fields.
#[derive(Serialize)]
struct Tagged<'a, T> {
    #[serde(rename = "type")]
    kind: Value,
    #[serde(flatten)]
    inner: &'a T,
}

fn tagged<T>(kind: impl Into<Value> + Copy, items: &[T]) -> impl Iterator<Item = Tagged<'_, T>> {
    items.iter().map(move |inner| Tagged { kind: kind.into(), inner })
}

impl Serialize for Primitives {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Meshes(v) => serializer.collect_seq(tagged(PrimitiveType::Mesh as u32, v)),
            Self::Polylines(v) => serializer.collect_seq(tagged(PrimitiveType::Polyline as u32, v)),
            Self::PointStrings(v) => serializer.collect_seq(tagged(PrimitiveType::Point as u32, v)),
            Self::AreaPatterns(v) => serializer.collect_seq(tagged(AREA_PATTERN_TYPE, v)),
        }
    }
}

/// A mesh: a primitive array plus an optional display layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub primitives: Option<Primitives>,
    pub layer: Option<String>,
}

impl Mesh {
    pub fn new(primitives: Primitives) -> Self {
        Self { primitives: Some(primitives), layer: None }
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// Number of primitives in the mesh.
    pub fn primitive_count(&self) -> usize {
        self.primitives.as_ref().map_or(0, Primitives::len)
    }
}

impl Serialize for Mesh {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(p) = self.primitives.as_ref().filter(|p| !p.is_empty()) {
            map.serialize_entry("primitives", p)?;
        }
        if let Some(layer) = self.layer.as_ref().filter(|l| !l.is_empty()) {
            map.serialize_entry("layer", layer)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Mesh {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RawMesh {
            #[serde(default)]
            primitives: Vec<Value>,
            #[serde(default)]
            layer: Option<String>,
        }

        let raw = RawMesh::deserialize(deserializer)?;
        let primitives = Primitives::from_values(raw.primitives).map_err(de::Error::custom)?;
        Ok(Self { primitives, layer: raw.layer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_primitives() -> serde_json::Result<()> {
        let json = r#"{"primitives": [
            {"type": 0, "material": "m", "vertices": {"bufferView": "v0", "count": 3},
             "surface": {"type": 2, "indices": "i0"}},
            {"type": 0, "vertices": {"bufferView": "v1"}, "surface": {"type": 0, "indices": "i1"}}
        ], "layer": "L1"}"#;
        let mesh: Mesh = serde_json::from_str(json)?;
        assert_eq!(mesh.layer.as_deref(), Some("L1"));
        let Some(Primitives::Meshes(prims)) = &mesh.primitives else {
            panic!("expected meshes, got {:?}", mesh.primitives);
        };
        assert_eq!(prims.len(), 2);
        assert_eq!(prims[0].surface.kind, 2);
        assert_eq!(prims[1].surface.indices, "i1");

        let out = serde_json::to_value(&mesh)?;
        assert_eq!(out["primitives"][0]["type"], 0);
        assert_eq!(out["primitives"][0]["vertices"]["bufferView"], "v0");
        assert_eq!(out["layer"], "L1");
        Ok(())
    }

    #[test]
    fn test_polyline_and_points() -> serde_json::Result<()> {
        let mesh: Mesh = serde_json::from_str(r#"{"primitives": [{"type": 1, "indices": "a"}]}"#)?;
        assert!(matches!(mesh.primitives, Some(Primitives::Polylines(ref v)) if v[0].polyline.indices == "a"));

        let mesh: Mesh = serde_json::from_str(r#"{"primitives": [{"type": 2, "indices": "b"}]}"#)?;
        assert!(matches!(mesh.primitives, Some(Primitives::PointStrings(ref v)) if v[0].indices == "b"));
        assert_eq!(serde_json::to_value(&mesh)?["primitives"][0]["type"], 2);
        Ok(())
    }

    #[test]
    fn test_area_pattern() -> serde_json::Result<()> {
        let json = r#"{"primitives": [{"type": "areaPattern", "symbolName": "hatch", "scale": 2.0,
                      "xyOffsets": "bvOffsets"}]}"#;
        let mesh: Mesh = serde_json::from_str(json)?;
        let Some(Primitives::AreaPatterns(p)) = &mesh.primitives else {
            panic!("expected area patterns");
        };
        assert_eq!(p[0].symbol_name, "hatch");
        assert_eq!(p[0].xy_offsets, "bvOffsets");
        assert_eq!(serde_json::to_value(&mesh)?["primitives"][0]["type"], "areaPattern");
        Ok(())
    }

    #[test]
    fn test_empty_and_invalid() {
        let mesh: Mesh = serde_json::from_str(r#"{"primitives": []}"#).unwrap();
        assert!(mesh.primitives.is_none());
        assert_eq!(serde_json::to_string(&mesh).unwrap(), "{}");

        assert!(serde_json::from_str::<Mesh>(r#"{"primitives": [{"type": 7}]}"#).is_err());
        assert!(serde_json::from_str::<Mesh>(r#"{"primitives": [{"type": "blob"}]}"#).is_err());
        assert!(serde_json::from_str::<Mesh>(r#"{"primitives": [{"type": 0}, {"type": 1}]}"#).is_err());
    }

    #[test]
    fn test_primitive_arrays_are_homogeneous() {
        let mixed = serde_json::from_str::<Mesh>(r#"{"primitives": [{"type": 2}, {"type": 2}, {"type": 0}]}"#);
        let err = mixed.unwrap_err().to_string();
        assert!(err.contains("primitive 2 does not match"), "{}", err);

        let untyped = serde_json::from_str::<Mesh>(r#"{"primitives": [{"type": 1}, {"indices": "i"}]}"#);
        assert!(untyped.unwrap_err().to_string().contains("primitive 1 does not match"));

        let first_untyped = serde_json::from_str::<Mesh>(r#"{"primitives": [{"indices": "i"}]}"#);
        assert!(first_untyped.unwrap_err().to_string().contains("primitive has no type"));

        let area = r#"{"primitives": [{"type": "areaPattern"}, {"type": 0}]}"#;
        assert!(serde_json::from_str::<Mesh>(area).is_err());
    }
}
