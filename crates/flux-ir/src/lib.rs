//! Data model for Flux JSON scene descriptions.
//!
//! Flux JSON is untyped: a scene is any nesting of primitive records,
//! entity maps (`{"Entities": {name: value, ...}}`) and arrays. This crate
//! classifies raw values by shape, canonicalizes primitive names, and parses
//! the per-kind records the geometry builders consume.
//!
//! Nothing here produces geometry; see `flux-scene` for that.

mod records;

pub use records::*;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Key carrying the primitive name on a record.
pub const PRIMITIVE_KEY: &str = "primitive";

/// Key of the nested map in an entity-map node.
pub const ENTITIES_KEY: &str = "Entities";

/// Errors raised while reading a primitive record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IrError {
    /// A required field is absent.
    #[error("{primitive} is missing required field `{field}`")]
    MissingField {
        /// Canonical primitive name.
        primitive: String,
        /// Field name as spelled in JSON.
        field: &'static str,
    },

    /// A field is present but has the wrong shape.
    #[error("{primitive} has an invalid field: {message}")]
    InvalidField {
        /// Canonical primitive name.
        primitive: String,
        /// Description of the problem.
        message: String,
    },
}

/// Result type for record parsing.
pub type Result<T> = std::result::Result<T, IrError>;

/// Capability class of a primitive, checked by container primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityClass {
    /// Zero-dimensional.
    Vertex,
    /// One-dimensional (curves).
    Wire,
    /// Two-dimensional (surfaces).
    Sheet,
    /// Closed volumes and meshes.
    Solid,
}

impl std::fmt::Display for EntityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityClass::Vertex => "vertex",
            EntityClass::Wire => "wire",
            EntityClass::Sheet => "sheet",
            EntityClass::Solid => "solid",
        };
        f.write_str(name)
    }
}

/// Every primitive kind understood by the standard builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Single point.
    Point,
    /// Straight segment.
    Line,
    /// Connected segments.
    Polyline,
    /// Three-point circular arc.
    Arc,
    /// Full circle.
    Circle,
    /// Full ellipse.
    Ellipse,
    /// Closed rectangle outline.
    Rectangle,
    /// NURBS curve.
    Curve,
    /// Container of wire primitives.
    Polycurve,
    /// NURBS surface.
    Surface,
    /// Planar polygons with holes.
    PolygonSet,
    /// Container of sheet primitives.
    Polysurface,
    /// Box.
    Block,
    /// Sphere.
    Sphere,
    /// Capped cylinder.
    Cylinder,
    /// Capped cone or frustum.
    Cone,
    /// Torus.
    Torus,
    /// Explicit vertex/face mesh.
    Mesh,
    /// Boundary representation tessellated by an external service.
    Brep,
}

impl PrimitiveKind {
    /// All kinds in declaration order.
    pub const ALL: [PrimitiveKind; 19] = [
        PrimitiveKind::Point,
        PrimitiveKind::Line,
        PrimitiveKind::Polyline,
        PrimitiveKind::Arc,
        PrimitiveKind::Circle,
        PrimitiveKind::Ellipse,
        PrimitiveKind::Rectangle,
        PrimitiveKind::Curve,
        PrimitiveKind::Polycurve,
        PrimitiveKind::Surface,
        PrimitiveKind::PolygonSet,
        PrimitiveKind::Polysurface,
        PrimitiveKind::Block,
        PrimitiveKind::Sphere,
        PrimitiveKind::Cylinder,
        PrimitiveKind::Cone,
        PrimitiveKind::Torus,
        PrimitiveKind::Mesh,
        PrimitiveKind::Brep,
    ];

    /// Canonical JSON name.
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveKind::Point => "point",
            PrimitiveKind::Line => "line",
            PrimitiveKind::Polyline => "polyline",
            PrimitiveKind::Arc => "arc",
            PrimitiveKind::Circle => "circle",
            PrimitiveKind::Ellipse => "ellipse",
            PrimitiveKind::Rectangle => "rectangle",
            PrimitiveKind::Curve => "curve",
            PrimitiveKind::Polycurve => "polycurve",
            PrimitiveKind::Surface => "surface",
            PrimitiveKind::PolygonSet => "polygonSet",
            PrimitiveKind::Polysurface => "polysurface",
            PrimitiveKind::Block => "block",
            PrimitiveKind::Sphere => "sphere",
            PrimitiveKind::Cylinder => "cylinder",
            PrimitiveKind::Cone => "cone",
            PrimitiveKind::Torus => "torus",
            PrimitiveKind::Mesh => "mesh",
            PrimitiveKind::Brep => "brep",
        }
    }

    /// Look up a kind by name, accepting legacy spellings.
    pub fn parse(name: &str) -> Option<Self> {
        let canonical = canonical_name(name);
        Self::ALL.into_iter().find(|k| k.as_str() == canonical)
    }

    /// Capability class used by container validation.
    pub fn entity_class(self) -> EntityClass {
        match self {
            PrimitiveKind::Point => EntityClass::Vertex,
            PrimitiveKind::Line
            | PrimitiveKind::Polyline
            | PrimitiveKind::Arc
            | PrimitiveKind::Circle
            | PrimitiveKind::Ellipse
            | PrimitiveKind::Rectangle
            | PrimitiveKind::Curve
            | PrimitiveKind::Polycurve => EntityClass::Wire,
            PrimitiveKind::Surface | PrimitiveKind::PolygonSet | PrimitiveKind::Polysurface => {
                EntityClass::Sheet
            }
            PrimitiveKind::Block
            | PrimitiveKind::Sphere
            | PrimitiveKind::Cylinder
            | PrimitiveKind::Cone
            | PrimitiveKind::Torus
            | PrimitiveKind::Mesh
            | PrimitiveKind::Brep => EntityClass::Solid,
        }
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map deprecated primitive spellings onto their current names.
///
/// Unknown names pass through untouched so custom builders can register
/// their own kinds.
pub fn canonical_name(name: &str) -> &str {
    match name {
        "point-2d" | "point2d" => "point",
        "polygon-set" | "polygonset" => "polygonSet",
        "poly-surface" | "polySurface" => "polysurface",
        "poly-curve" | "polyCurve" => "polycurve",
        "box" => "block",
        other => other,
    }
}

/// Shape of an arbitrary JSON value as seen by the scene assembler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JsonShape<'a> {
    /// Object with a string `primitive` key.
    Primitive(&'a Value),
    /// Object with an `Entities` object.
    EntityMap(&'a Map<String, Value>),
    /// Array of arbitrary values.
    List(&'a [Value]),
    /// Anything else. Ignored by the assembler.
    Unrecognized,
}

/// Classify a value for dispatch.
pub fn classify(value: &Value) -> JsonShape<'_> {
    match value {
        Value::Object(map) => {
            if map.get(PRIMITIVE_KEY).is_some_and(Value::is_string) {
                JsonShape::Primitive(value)
            } else if let Some(Value::Object(entities)) = map.get(ENTITIES_KEY) {
                JsonShape::EntityMap(entities)
            } else {
                JsonShape::Unrecognized
            }
        }
        Value::Array(items) => JsonShape::List(items),
        _ => JsonShape::Unrecognized,
    }
}

/// Color as written in JSON: an `[r, g, b]` triple in `0..1` or a hex string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    /// Linear components.
    Rgb([f64; 3]),
    /// `"#rrggbb"` or `"rrggbb"`.
    Hex(String),
}

/// Per-primitive rendering overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialProperties {
    /// Base color.
    #[serde(default, alias = "diffuse", skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorValue>,
    /// Opacity in `0..1`.
    #[serde(default, alias = "alpha", skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Surface roughness in `0..1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roughness: Option<f64>,
    /// Render edges only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wireframe: Option<bool>,
    /// Point or line size.
    #[serde(default, alias = "pointSize", skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

/// The `attributes` object a primitive may carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attributes {
    /// Free-form user tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Material overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_properties: Option<MaterialProperties>,
    /// Anything else, preserved for callers.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One primitive record, borrowed from the input tree.
///
/// Holds the canonical kind name plus the fields every kind shares; the
/// kind-specific payload is parsed on demand with [`PrimitiveRecord::parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveRecord<'a> {
    /// Canonical primitive name.
    pub kind: String,
    /// User-supplied identifier.
    pub id: Option<String>,
    /// Attributes, when present.
    pub attributes: Option<Attributes>,
    raw: &'a Value,
}

impl<'a> PrimitiveRecord<'a> {
    /// Read the shared fields of a primitive object.
    ///
    /// Returns `None` when `value` is not an object with a string
    /// `primitive` key.
    pub fn from_value(value: &'a Value) -> Option<Result<Self>> {
        let map = value.as_object()?;
        let name = map.get(PRIMITIVE_KEY)?.as_str()?;
        let kind = canonical_name(name).to_string();
        Some(Self::read(kind, map, value))
    }

    fn read(kind: String, map: &Map<String, Value>, raw: &'a Value) -> Result<Self> {
        let id = match map.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let attributes = match map.get("attributes") {
            None | Some(Value::Null) => None,
            Some(value) => Some(Attributes::deserialize(value).map_err(|e| {
                IrError::InvalidField {
                    primitive: kind.clone(),
                    message: format!("attributes: {e}"),
                }
            })?),
        };
        Ok(Self {
            kind,
            id,
            attributes,
            raw,
        })
    }

    /// Standard kind, if the name is one.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        PrimitiveKind::parse(&self.kind)
    }

    /// The untouched JSON object.
    pub fn raw(&self) -> &'a Value {
        self.raw
    }

    /// Raw value of one field.
    pub fn field(&self, name: &str) -> Option<&'a Value> {
        self.raw.get(name).filter(|v| !v.is_null())
    }

    /// Fail with [`IrError::MissingField`] naming the first absent field.
    pub fn require(&self, fields: &[&'static str]) -> Result<()> {
        match fields.iter().find(|f| self.field(f).is_none()) {
            Some(field) => Err(IrError::MissingField {
                primitive: self.kind.clone(),
                field,
            }),
            None => Ok(()),
        }
    }

    /// Parse the kind-specific payload.
    pub fn parse<T: Record>(&self) -> Result<T> {
        self.require(T::REQUIRED)?;
        self.deserialize()
    }

    /// Deserialize the whole object as `T` without a presence check.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(self.raw).map_err(|e| IrError::InvalidField {
            primitive: self.kind.clone(),
            message: e.to_string(),
        })
    }

    /// Placement fields shared by oriented primitives.
    pub fn placement(&self) -> Result<Placement> {
        self.deserialize()
    }

    /// Material overrides, if any.
    pub fn material_properties(&self) -> Option<&MaterialProperties> {
        self.attributes.as_ref()?.material_properties.as_ref()
    }
}
