//! Kind-specific primitive payloads.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A typed primitive payload with a list of fields that must be present.
pub trait Record: DeserializeOwned {
    /// Fields checked before deserialization so errors can name them.
    const REQUIRED: &'static [&'static str];
}

/// A position written as `[x, y]` or `[x, y, z]`; `z` defaults to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 3]")]
pub struct Coord(pub [f64; 3]);

impl TryFrom<Vec<f64>> for Coord {
    type Error = String;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [x, y] => Ok(Coord([*x, *y, 0.0])),
            [x, y, z] => Ok(Coord([*x, *y, *z])),
            _ => Err(format!("expected 2 or 3 coordinates, got {}", v.len())),
        }
    }
}

impl From<Coord> for [f64; 3] {
    fn from(c: Coord) -> Self {
        c.0
    }
}

/// A control point written as `[x, y, z]` or homogeneous-style `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct ControlPoint {
    /// Cartesian position.
    pub position: [f64; 3],
    /// Rational weight carried inline, if any.
    pub weight: Option<f64>,
}

impl TryFrom<Vec<f64>> for ControlPoint {
    type Error = String;

    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [x, y, z] => Ok(ControlPoint {
                position: [*x, *y, *z],
                weight: None,
            }),
            [x, y, z, w] => Ok(ControlPoint {
                position: [*x, *y, *z],
                weight: Some(*w),
            }),
            _ => Err(format!(
                "control points need 3 or 4 components, got {}",
                v.len()
            )),
        }
    }
}

/// Optional placement fields shared by positioned primitives.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Position of the local origin.
    #[serde(default)]
    pub origin: Option<Coord>,
    /// Direction the local +Z axis should face.
    #[serde(default)]
    pub axis: Option<Coord>,
    /// Alias of `axis` used by some exporters.
    #[serde(default)]
    pub direction: Option<Coord>,
    /// Alias of `axis` used by planar primitives.
    #[serde(default)]
    pub normal: Option<Coord>,
    /// In-plane reference direction (local +X) for ellipses and rectangles.
    #[serde(default)]
    pub reference: Option<Coord>,
}

impl Placement {
    /// First orientation vector present, in `axis`, `direction`, `normal` order.
    pub fn orientation(&self) -> Option<Coord> {
        self.axis.or(self.direction).or(self.normal)
    }
}

macro_rules! record {
    ($(#[$meta:meta])* $name:ident [$($req:literal),*] { $($body:tt)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name { $($body)* }

        impl Record for $name {
            const REQUIRED: &'static [&'static str] = &[$($req),*];
        }
    };
}

record! {
    /// `point`: a single vertex.
    PointRecord ["point"] {
        /// Location.
        pub point: Coord,
    }
}

record! {
    /// `line`: one segment.
    LineRecord ["start", "end"] {
        /// First endpoint.
        pub start: Coord,
        /// Second endpoint.
        pub end: Coord,
    }
}

record! {
    /// `polyline`: connected segments through `points`.
    PolylineRecord ["points"] {
        /// Vertices in order.
        pub points: Vec<Coord>,
    }
}

record! {
    /// `arc`: circular arc through three points.
    ArcRecord ["start", "middle", "end"] {
        /// Arc start.
        pub start: Coord,
        /// Any point on the arc between start and end.
        pub middle: Coord,
        /// Arc end.
        pub end: Coord,
    }
}

record! {
    /// `circle`: full circle around `origin`, in the plane facing `axis`.
    CircleRecord ["radius"] {
        /// Radius.
        pub radius: f64,
    }
}

record! {
    /// `ellipse`: full ellipse, major radius along the local X axis.
    EllipseRecord ["majorRadius", "minorRadius"] {
        /// Semi-major axis length.
        pub major_radius: f64,
        /// Semi-minor axis length.
        pub minor_radius: f64,
    }
}

record! {
    /// `rectangle`: closed outline centered on `origin`.
    RectangleRecord ["dimensions"] {
        /// Width and height (a third component is ignored).
        pub dimensions: Coord,
    }
}

record! {
    /// `curve`: rational B-spline curve.
    CurveRecord ["degree", "knots", "controlPoints"] {
        /// Polynomial degree.
        pub degree: usize,
        /// Knot vector, `controlPoints.len() + degree + 1` entries.
        pub knots: Vec<f64>,
        /// Control polygon.
        pub control_points: Vec<ControlPoint>,
        /// Per-point weights overriding inline ones.
        #[serde(default)]
        pub weights: Option<Vec<f64>>,
    }
}

record! {
    /// `polycurve`: a chain of wire primitives.
    PolycurveRecord ["curves"] {
        /// Member primitives, each a JSON primitive object.
        pub curves: Vec<Value>,
    }
}

record! {
    /// `surface`: rational B-spline surface over a `controlPoints[u][v]` grid.
    SurfaceRecord ["uDegree", "vDegree", "uKnots", "vKnots", "controlPoints"] {
        /// Degree along u.
        pub u_degree: usize,
        /// Degree along v.
        pub v_degree: usize,
        /// Knots along u.
        pub u_knots: Vec<f64>,
        /// Knots along v.
        pub v_knots: Vec<f64>,
        /// Rows along u, each a column of points along v.
        pub control_points: Vec<Vec<ControlPoint>>,
        /// Per-point weights with the same shape as `controlPoints`.
        #[serde(default)]
        pub weights: Option<Vec<Vec<f64>>>,
    }
}

/// One polygon of a `polygonSet`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolygonRecord {
    /// Outer loop.
    pub boundary: Vec<Coord>,
    /// Inner loops.
    #[serde(default)]
    pub holes: Vec<Vec<Coord>>,
}

record! {
    /// `polygonSet`: planar polygons with holes.
    PolygonSetRecord ["polygons"] {
        /// Member polygons.
        pub polygons: Vec<PolygonRecord>,
    }
}

record! {
    /// `polysurface`: a group of sheet primitives.
    PolysurfaceRecord ["surfaces"] {
        /// Member primitives, each a JSON primitive object.
        pub surfaces: Vec<Value>,
    }
}

record! {
    /// `block`: box centered on `origin`.
    BlockRecord ["dimensions"] {
        /// Size along X, Y and Z.
        pub dimensions: Coord,
    }
}

record! {
    /// `sphere`.
    SphereRecord ["radius"] {
        /// Radius.
        pub radius: f64,
    }
}

record! {
    /// `cylinder`: extends from `origin` along `axis`.
    CylinderRecord ["radius", "height"] {
        /// Radius.
        pub radius: f64,
        /// Length along the axis.
        pub height: f64,
    }
}

record! {
    /// `cone`: `radius` at `origin`, narrowing by `semiAngle` degrees.
    ConeRecord ["radius", "height"] {
        /// Base radius.
        pub radius: f64,
        /// Length along the axis.
        pub height: f64,
        /// Half-angle in degrees.
        #[serde(default)]
        pub semi_angle: f64,
    }
}

record! {
    /// `torus`: ring around the local Z axis.
    TorusRecord ["majorRadius", "minorRadius"] {
        /// Distance from center to tube center.
        pub major_radius: f64,
        /// Tube radius.
        pub minor_radius: f64,
    }
}

record! {
    /// `mesh`: explicit vertices and polygonal faces.
    MeshRecord ["vertices", "faces"] {
        /// Vertex positions.
        pub vertices: Vec<Coord>,
        /// Faces as vertex index loops (three or more).
        pub faces: Vec<Vec<u32>>,
    }
}

record! {
    /// `brep`: encoded solid tessellated out of process.
    BrepRecord ["content", "format"] {
        /// Raw file content.
        pub content: String,
        /// Exchange format, such as `x_b` or `step`.
        pub format: String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IrError, PrimitiveRecord};
    use serde_json::json;

    fn parse<T: Record>(value: serde_json::Value) -> crate::Result<T> {
        let record = PrimitiveRecord::from_value(&value)
            .expect("primitive object")
            .expect("shared fields");
        record.parse()
    }

    #[test]
    fn coord_accepts_two_or_three_components() {
        let r: LineRecord =
            parse(json!({"primitive": "line", "start": [1, 2], "end": [3, 4, 5]})).unwrap();
        assert_eq!(r.start, Coord([1.0, 2.0, 0.0]));
        assert_eq!(r.end, Coord([3.0, 4.0, 5.0]));

        let err = parse::<LineRecord>(json!({"primitive": "line", "start": [1], "end": [0, 0]}))
            .unwrap_err();
        assert!(matches!(err, IrError::InvalidField { .. }));
        assert!(err.to_string().contains("2 or 3 coordinates"));
    }

    #[test]
    fn curve_weights_inline_or_separate() {
        let r: CurveRecord = parse(json!({
            "primitive": "curve",
            "degree": 2,
            "knots": [0, 0, 0, 1, 1, 1],
            "controlPoints": [[0, 0, 0, 1], [1, 1, 0, 0.5], [2, 0, 0]],
            "weights": [1, 2, 1]
        }))
        .unwrap();
        assert_eq!(r.control_points[1].weight, Some(0.5));
        assert_eq!(r.control_points[2].weight, None);
        assert_eq!(r.weights, Some(vec![1.0, 2.0, 1.0]));
    }

    #[test]
    fn surface_requires_every_knot_vector() {
        let err = parse::<SurfaceRecord>(json!({
            "primitive": "surface",
            "uDegree": 1, "vDegree": 1,
            "uKnots": [0, 0, 1, 1],
            "controlPoints": [[[0, 0, 0], [0, 1, 0]], [[1, 0, 0], [1, 1, 0]]]
        }))
        .unwrap_err();
        assert!(matches!(err, IrError::MissingField { field: "vKnots", .. }));
    }

    #[test]
    fn polygon_holes_default_empty() {
        let r: PolygonSetRecord = parse(json!({
            "primitive": "polygonSet",
            "polygons": [{"boundary": [[0, 0], [1, 0], [1, 1]]}]
        }))
        .unwrap();
        assert!(r.polygons[0].holes.is_empty());
    }

    #[test]
    fn cone_semi_angle_defaults_to_zero() {
        let r: ConeRecord =
            parse(json!({"primitive": "cone", "radius": 1, "height": 2})).unwrap();
        assert_eq!(r.semi_angle, 0.0);
    }

    #[test]
    fn placement_prefers_axis() {
        let value = json!({
            "primitive": "cylinder",
            "origin": [1, 2, 3],
            "direction": [1, 0, 0],
            "normal": [0, 1, 0]
        });
        let record = PrimitiveRecord::from_value(&value).unwrap().unwrap();
        let placement = record.placement().unwrap();
        assert_eq!(placement.origin, Some(Coord([1.0, 2.0, 3.0])));
        assert_eq!(placement.orientation(), Some(Coord([1.0, 0.0, 0.0])));
    }

    #[test]
    fn wrong_type_is_invalid_not_missing() {
        let err = parse::<SphereRecord>(json!({"primitive": "sphere", "radius": "big"}))
            .unwrap_err();
        assert!(matches!(err, IrError::InvalidField { .. }));
    }
}
