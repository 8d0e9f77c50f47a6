//! Wire builders: points, lines, arcs, conics, NURBS curves and polycurves.
//!
//! Everything here produces `Line` nodes (or `Points` for `point`) backed by
//! segment-pair buffers.

use flux_ir::{
    ArcRecord, CircleRecord, ControlPoint, CurveRecord, EllipseRecord, EntityClass, LineRecord,
    PointRecord, PolycurveRecord, PolylineRecord, PrimitiveRecord, RectangleRecord,
};
use flux_math::{bake_transform, point_from_array, Point3};
use flux_nurbs::{evaluate_curve, WeightedPoint};
use flux_tessellate::{arc_points, circle_points, ellipse_points, BufferGeometry, TessellateError};

use super::{finish, point, positive, reference_rotation, BuildContext};
use crate::error::{GeometryError, Result};
use crate::material::Material;
use crate::node::{Geometry, NodeKind, SceneNode};

fn line_node(points: &[Point3], material: &Material) -> SceneNode {
    SceneNode::new(
        NodeKind::Line,
        Geometry::Buffer(BufferGeometry::line_strip(points)),
        *material,
    )
}

pub(crate) fn build_point(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    _ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: PointRecord = record.parse()?;
    let node = SceneNode::new(
        NodeKind::Points,
        Geometry::Buffer(BufferGeometry::from_points(&[point(&rec.point)])),
        *material,
    );
    finish(node, record)
}

pub(crate) fn build_line(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    _ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: LineRecord = record.parse()?;
    finish(line_node(&[point(&rec.start), point(&rec.end)], material), record)
}

pub(crate) fn build_polyline(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    _ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: PolylineRecord = record.parse()?;
    if rec.points.len() < 2 {
        return Err(GeometryError::invalid(
            &record.kind,
            format!("`points` needs at least 2 entries, got {}", rec.points.len()),
        ));
    }
    let points: Vec<Point3> = rec.points.iter().map(point).collect();
    finish(line_node(&points, material), record)
}

pub(crate) fn build_arc(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: ArcRecord = record.parse()?;
    let points = arc_points(
        &point(&rec.start),
        &point(&rec.middle),
        &point(&rec.end),
        ctx.pool,
    )?;
    if points.is_empty() {
        return Err(TessellateError::ArcNoVertices.into());
    }
    finish(line_node(&points, material), record)
}

pub(crate) fn build_circle(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: CircleRecord = record.parse()?;
    let radius = positive(&record.kind, "radius", rec.radius)?;
    let points = circle_points(radius, ctx.params.circle_segments);
    finish(line_node(&points, material), record)
}

pub(crate) fn build_ellipse(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: EllipseRecord = record.parse()?;
    let major = positive(&record.kind, "majorRadius", rec.major_radius)?;
    let minor = positive(&record.kind, "minorRadius", rec.minor_radius)?;
    let points = ellipse_points(major, minor, ctx.params.circle_segments);
    let points = bake_transform(&points, &reference_rotation(&record.placement()?)?);
    finish(line_node(&points, material), record)
}

pub(crate) fn build_rectangle(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    _ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: RectangleRecord = record.parse()?;
    let [w, h, _] = rec.dimensions.0;
    let hw = positive(&record.kind, "dimensions[0]", w)? / 2.0;
    let hh = positive(&record.kind, "dimensions[1]", h)? / 2.0;
    let corners = [
        Point3::new(-hw, -hh, 0.0),
        Point3::new(hw, -hh, 0.0),
        Point3::new(hw, hh, 0.0),
        Point3::new(-hw, hh, 0.0),
        Point3::new(-hw, -hh, 0.0),
    ];
    let points = bake_transform(&corners, &reference_rotation(&record.placement()?)?);
    finish(line_node(&points, material), record)
}

/// Combine control points with an optional parallel `weights` array.
///
/// An explicit array wins over inline fourth components; missing weights are 1.
pub(crate) fn weighted_points(
    primitive: &str,
    control_points: &[ControlPoint],
    weights: Option<&[f64]>,
) -> Result<Vec<WeightedPoint>> {
    if let Some(w) = weights {
        if w.len() != control_points.len() {
            return Err(GeometryError::invalid(
                primitive,
                format!(
                    "`weights` has {} entries for {} control points",
                    w.len(),
                    control_points.len()
                ),
            ));
        }
    }
    Ok(control_points
        .iter()
        .enumerate()
        .map(|(i, cp)| {
            let weight = weights
                .map(|w| w[i])
                .or(cp.weight)
                .unwrap_or(1.0);
            WeightedPoint::new(point_from_array(cp.position), weight)
        })
        .collect())
}

pub(crate) fn build_curve(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    _ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: CurveRecord = record.parse()?;
    let points = weighted_points(&record.kind, &rec.control_points, rec.weights.as_deref())?;
    let samples = evaluate_curve(rec.degree, &rec.knots, &points)?;
    finish(line_node(&samples, material), record)
}

pub(crate) fn build_polycurve(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: PolycurveRecord = record.parse()?;
    if rec.curves.is_empty() {
        return Err(GeometryError::invalid(&record.kind, "`curves` is empty"));
    }
    let mut parts = Vec::with_capacity(rec.curves.len());
    for value in &rec.curves {
        let member = ctx.build_member(&record.kind, EntityClass::Wire, value)?;
        if let Some(geometry) = member.geometry() {
            parts.push(geometry.transformed(&member.transform));
        }
    }
    let node = SceneNode::new(NodeKind::Line, Geometry::combine(parts), *material);
    finish(node, record)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::build;
    use super::*;
    use approx::assert_abs_diff_eq;
    use flux_nurbs::NurbsError;
    use serde_json::json;

    fn vertex_count(node: &SceneNode) -> usize {
        node.num_vertices()
    }

    #[test]
    fn true_arc_is_curved() {
        let node = build(&json!({
            "primitive": "arc",
            "start": [1, 0, 0],
            "middle": [0, 1, 0],
            "end": [-1, 0, 0]
        }))
        .unwrap();
        assert_eq!(node.kind, NodeKind::Line);
        let positions: Vec<Point3> = node
            .geometry()
            .and_then(Geometry::as_buffer)
            .map(|b| b.positions().collect())
            .unwrap();
        assert!(positions.len() > 3, "got {}", positions.len());
        for p in &positions {
            assert_abs_diff_eq!(p.coords.norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn degenerate_arc_keeps_three_points() {
        let node = build(&json!({
            "primitive": "arc",
            "start": [0, 0, 0],
            "middle": [1, 1, 0],
            "end": [0, 0, 0]
        }))
        .unwrap();
        let buffer = node.geometry().and_then(Geometry::as_buffer).unwrap();
        assert_eq!(buffer.num_segments(), 2);
        assert_eq!(vertex_count(&node), 3);
    }

    #[test]
    fn arc_missing_middle_names_field() {
        let err = build(&json!({"primitive": "arc", "start": [0, 0], "end": [1, 0]})).unwrap_err();
        assert_eq!(
            err,
            GeometryError::MissingField {
                primitive: "arc".into(),
                field: "middle"
            }
        );
    }

    #[test]
    fn cubic_curve_knot_count() {
        let cps = json!([[0, 0, 0], [1, 2, 0], [3, 2, 0], [4, 0, 0]]);
        let ok = build(&json!({
            "primitive": "curve",
            "degree": 3,
            "controlPoints": cps,
            "knots": [0, 0, 0, 0, 1, 1, 1, 1]
        }))
        .unwrap();
        assert_eq!(ok.kind, NodeKind::Line);
        let buffer = ok.geometry().and_then(Geometry::as_buffer).unwrap();
        // 4 control points * degree 3 * 4 samples per span.
        assert_eq!(buffer.num_segments(), 48);

        for knots in [json!([0, 0, 0, 1, 1, 1, 1]), json!([0, 0, 0, 0, 0.5, 1, 1, 1, 1])] {
            let err = build(&json!({
                "primitive": "curve",
                "degree": 3,
                "controlPoints": cps,
                "knots": knots
            }))
            .unwrap_err();
            assert!(
                matches!(err, GeometryError::Knots(NurbsError::KnotCount { .. })),
                "{err}"
            );
        }
    }

    #[test]
    fn weights_array_must_match() {
        let err = build(&json!({
            "primitive": "curve",
            "degree": 1,
            "controlPoints": [[0, 0, 0], [1, 0, 0]],
            "knots": [0, 0, 1, 1],
            "weights": [1]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("weights"), "{err}");
    }

    #[test]
    fn explicit_weights_override_inline() {
        let cps = [
            ControlPoint { position: [0.0, 0.0, 0.0], weight: Some(2.0) },
            ControlPoint { position: [1.0, 0.0, 0.0], weight: None },
        ];
        let inline = weighted_points("curve", &cps, None).unwrap();
        assert_eq!(inline[0].weight, 2.0);
        assert_eq!(inline[1].weight, 1.0);
        let explicit = weighted_points("curve", &cps, Some(&[3.0, 4.0])).unwrap();
        assert_eq!(explicit[0].weight, 3.0);
        assert_eq!(explicit[1].weight, 4.0);
    }

    #[test]
    fn circle_and_rectangle_close() {
        let circle = build(&json!({"primitive": "circle", "radius": 2.0})).unwrap();
        let buffer = circle.geometry().and_then(Geometry::as_buffer).unwrap();
        assert_eq!(buffer.num_segments(), 32);

        let rect = build(&json!({"primitive": "rectangle", "dimensions": [4, 2]})).unwrap();
        let (min, max) = rect.bounding_box().unwrap();
        assert_abs_diff_eq!(min.x, -2.0);
        assert_abs_diff_eq!(max.y, 1.0);
        let buffer = rect.geometry().and_then(Geometry::as_buffer).unwrap();
        assert_eq!(buffer.num_segments(), 4);
    }

    #[test]
    fn ellipse_follows_reference() {
        let node = build(&json!({
            "primitive": "ellipse",
            "majorRadius": 3.0,
            "minorRadius": 1.0,
            "reference": [0, 1, 0]
        }))
        .unwrap();
        let (min, max) = node.bounding_box().unwrap();
        assert_abs_diff_eq!(max.y - min.y, 6.0, epsilon = 1e-5);
        assert_abs_diff_eq!(max.x - min.x, 2.0, epsilon = 1e-2);
    }

    #[test]
    fn nonpositive_radius_is_invalid() {
        let err = build(&json!({"primitive": "circle", "radius": 0})).unwrap_err();
        assert!(err.to_string().contains("radius"), "{err}");
        let err = build(&json!({"primitive": "polyline", "points": [[0, 0]]})).unwrap_err();
        assert!(matches!(err, GeometryError::InvalidField { .. }));
    }

    #[test]
    fn polycurve_bakes_member_placement() {
        let node = build(&json!({
            "primitive": "polycurve",
            "curves": [
                {"primitive": "line", "start": [0, 0, 0], "end": [1, 0, 0]},
                {"primitive": "circle", "radius": 1, "origin": [10, 0, 0]}
            ]
        }))
        .unwrap();
        assert_eq!(node.kind, NodeKind::Line);
        let (min, max) = node.bounding_box().unwrap();
        assert_abs_diff_eq!(min.x, 0.0);
        assert_abs_diff_eq!(max.x, 11.0, epsilon = 1e-5);
    }

    #[test]
    fn polycurve_rejects_sheet_member() {
        let err = build(&json!({
            "primitive": "polycurve",
            "curves": [
                {"primitive": "line", "start": [0, 0], "end": [1, 0]},
                {
                    "primitive": "surface",
                    "uDegree": 1, "vDegree": 1,
                    "uKnots": [0, 0, 1, 1], "vKnots": [0, 0, 1, 1],
                    "controlPoints": [[[0, 0, 0], [0, 1, 0]], [[1, 0, 0], [1, 1, 0]]]
                }
            ]
        }))
        .unwrap_err();
        assert_eq!(
            err,
            GeometryError::Composition {
                container: "polycurve".into(),
                expected: EntityClass::Wire,
                found: "surface".into(),
            }
        );
    }

    #[test]
    fn point_builds_points_node() {
        let node = build(&json!({"primitive": "point-2d", "point": [1, 2]})).unwrap();
        assert_eq!(node.kind, NodeKind::Points);
        assert_eq!(node.num_vertices(), 1);
    }
}
