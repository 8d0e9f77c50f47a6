//! Sheet builders: NURBS surfaces, polygon sets and polysurfaces.

use flux_ir::{EntityClass, PolygonSetRecord, PolysurfaceRecord, PrimitiveRecord, SurfaceRecord};
use flux_nurbs::NurbsSurface;
use flux_tessellate::{tessellate_parametric, triangulate_polygon_set, Polygon};

use super::wire::weighted_points;
use super::{finish, point, BuildContext};
use crate::error::{GeometryError, Result};
use crate::material::Material;
use crate::node::{Geometry, NodeKind, SceneNode};

pub(crate) fn build_surface(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    _ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: SurfaceRecord = record.parse()?;
    if let Some(weights) = &rec.weights {
        if weights.len() != rec.control_points.len() {
            return Err(GeometryError::invalid(
                &record.kind,
                format!(
                    "`weights` has {} rows for {} control point rows",
                    weights.len(),
                    rec.control_points.len()
                ),
            ));
        }
    }
    let grid = rec
        .control_points
        .iter()
        .enumerate()
        .map(|(u, row)| {
            let row_weights = rec.weights.as_ref().map(|w| w[u].as_slice());
            weighted_points(&record.kind, row, row_weights)
        })
        .collect::<Result<Vec<_>>>()?;

    let surface = NurbsSurface::new(
        grid,
        rec.u_knots,
        rec.v_knots,
        rec.u_degree,
        rec.v_degree,
    )?;
    let (slices, stacks) = surface.subdivisions();
    let mesh = tessellate_parametric(|u, v| surface.eval_normalized(u, v), slices, stacks);
    finish(
        SceneNode::new(NodeKind::Mesh, Geometry::Faces(mesh), *material),
        record,
    )
}

pub(crate) fn build_polygon_set(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: PolygonSetRecord = record.parse()?;
    if rec.polygons.is_empty() {
        return Err(GeometryError::invalid(&record.kind, "`polygons` is empty"));
    }
    let polygons: Vec<Polygon> = rec
        .polygons
        .iter()
        .map(|p| Polygon {
            boundary: p.boundary.iter().map(point).collect(),
            holes: p
                .holes
                .iter()
                .map(|hole| hole.iter().map(point).collect())
                .collect(),
        })
        .collect();
    let mesh = triangulate_polygon_set(&polygons, ctx.pool)?;
    finish(
        SceneNode::new(NodeKind::Mesh, Geometry::Faces(mesh), *material),
        record,
    )
}

pub(crate) fn build_polysurface(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: PolysurfaceRecord = record.parse()?;
    if rec.surfaces.is_empty() {
        return Err(GeometryError::invalid(&record.kind, "`surfaces` is empty"));
    }
    let mut parts = Vec::with_capacity(rec.surfaces.len());
    for value in &rec.surfaces {
        let member = ctx.build_member(&record.kind, EntityClass::Sheet, value)?;
        if let Some(geometry) = member.geometry() {
            parts.push(geometry.transformed(&member.transform));
        }
    }
    finish(
        SceneNode::new(NodeKind::Mesh, Geometry::combine(parts), *material),
        record,
    )
}
