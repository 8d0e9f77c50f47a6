//! Primitive builders.
//!
//! One function per primitive kind, grouped by capability class:
//! [`wire`] (curves), [`sheet`] (surfaces) and [`solid`] (volumes and
//! meshes). Every builder has the [`BuildFn`](crate::registry::BuildFn)
//! signature and returns a finished node: geometry in local coordinates, the
//! element's placement as the node transform, and the z-up convention applied.

pub mod sheet;
pub mod solid;
pub mod wire;

use flux_ir::{Coord, EntityClass, Placement, PrimitiveKind, PrimitiveRecord};
use flux_math::{point_from_array, vec_from_array, z_up, EulerOrder, Point3, Tolerance, Transform, VectorPool};
use flux_tessellate::TessellationParams;
use serde_json::Value;

use crate::brep::BrepCache;
use crate::error::{GeometryError, Result};
use crate::material::resolve_material;
use crate::node::{NodeKind, PolygonOffset, SceneNode};
use crate::registry::{BuildFn, BuilderRegistry};

/// Shared state handed to every builder during one build call.
pub struct BuildContext<'a> {
    /// Scratch vectors for arc and polygon math. Cleared by the assembler.
    pub pool: &'a mut VectorPool,
    /// Tessellation quality.
    pub params: TessellationParams,
    /// Builders available to container primitives.
    pub registry: &'a BuilderRegistry,
    /// Resolved brep geometry, when the caller fetched it beforehand.
    pub breps: Option<&'a BrepCache>,
}

impl<'a> BuildContext<'a> {
    /// Context without brep geometry.
    pub fn new(
        pool: &'a mut VectorPool,
        params: TessellationParams,
        registry: &'a BuilderRegistry,
    ) -> Self {
        Self {
            pool,
            params,
            registry,
            breps: None,
        }
    }

    /// Same context with a brep cache attached.
    pub fn with_breps(mut self, breps: &'a BrepCache) -> Self {
        self.breps = Some(breps);
        self
    }

    /// Build one member of a container primitive.
    ///
    /// The member must be a primitive whose capability class is `expected`;
    /// anything else fails the container.
    pub fn build_member(
        &mut self,
        container: &str,
        expected: EntityClass,
        value: &Value,
    ) -> Result<SceneNode> {
        let record = PrimitiveRecord::from_value(value)
            .ok_or_else(|| GeometryError::invalid(container, "members must be primitive objects"))??;
        let entry = *self
            .registry
            .get(&record.kind)
            .ok_or_else(|| GeometryError::Unsupported(record.kind.clone()))?;
        if entry.class != expected {
            return Err(GeometryError::Composition {
                container: container.to_string(),
                expected,
                found: record.kind.clone(),
            });
        }
        let material = resolve_material(&record.kind, record.material_properties())?;
        (entry.build)(&record, &material, self)
    }
}

/// Register every standard builder.
pub(crate) fn register_standard(registry: &mut BuilderRegistry) {
    for kind in PrimitiveKind::ALL {
        registry.register(kind.as_str(), kind.entity_class(), standard_builder(kind));
    }
}

fn standard_builder(kind: PrimitiveKind) -> BuildFn {
    match kind {
        PrimitiveKind::Point => wire::build_point,
        PrimitiveKind::Line => wire::build_line,
        PrimitiveKind::Polyline => wire::build_polyline,
        PrimitiveKind::Arc => wire::build_arc,
        PrimitiveKind::Circle => wire::build_circle,
        PrimitiveKind::Ellipse => wire::build_ellipse,
        PrimitiveKind::Rectangle => wire::build_rectangle,
        PrimitiveKind::Curve => wire::build_curve,
        PrimitiveKind::Polycurve => wire::build_polycurve,
        PrimitiveKind::Surface => sheet::build_surface,
        PrimitiveKind::PolygonSet => sheet::build_polygon_set,
        PrimitiveKind::Polysurface => sheet::build_polysurface,
        PrimitiveKind::Block => solid::build_block,
        PrimitiveKind::Sphere => solid::build_sphere,
        PrimitiveKind::Cylinder => solid::build_cylinder,
        PrimitiveKind::Cone => solid::build_cone,
        PrimitiveKind::Torus => solid::build_torus,
        PrimitiveKind::Mesh => solid::build_mesh,
        PrimitiveKind::Brep => solid::build_brep,
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

pub(crate) fn point(c: &Coord) -> Point3 {
    point_from_array(c.0)
}

/// Reject zero, negative and non-finite sizes.
pub(crate) fn positive(primitive: &str, field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(GeometryError::invalid(
            primitive,
            format!("`{field}` must be positive, got {value}"),
        ))
    }
}

/// Node transform for the placement fields of a record: translate to
/// `origin`, then turn local +Z toward the orientation vector.
pub(crate) fn placement_transform(placement: &Placement) -> Result<Transform> {
    let translation = match placement.origin {
        Some(Coord([x, y, z])) => Transform::translation(x, y, z),
        None => Transform::identity(),
    };
    let Some((field, target)) = orientation(placement) else {
        return Ok(translation);
    };
    let target = vec_from_array(target.0);
    if target.norm() < Tolerance::DEFAULT.linear {
        return Err(GeometryError::ZeroLengthVector(field));
    }
    // +Z already faces +Z; look_at would nudge it.
    if (target.normalize() - z_up()).norm() < Tolerance::DEFAULT.linear {
        return Ok(translation);
    }
    let rotation = Transform::look_at(&target, &z_up()).ok_or(GeometryError::ZeroLengthVector(field))?;
    Ok(translation.then(&rotation))
}

fn orientation(placement: &Placement) -> Option<(&'static str, Coord)> {
    placement
        .axis
        .map(|c| ("axis", c))
        .or(placement.direction.map(|c| ("direction", c)))
        .or(placement.normal.map(|c| ("normal", c)))
}

/// In-plane rotation taking local +X onto the record's `reference` vector,
/// expressed in the frame set up by `placement_transform`.
pub(crate) fn reference_rotation(placement: &Placement) -> Result<Transform> {
    let Some(reference) = placement.reference else {
        return Ok(Transform::identity());
    };
    let frame = placement_transform(placement)?;
    let local = frame
        .inverse()
        .map(|inv| inv.apply_vec(&vec_from_array(reference.0)))
        .ok_or(GeometryError::ZeroLengthVector("reference"))?;
    if local.x.hypot(local.y) < Tolerance::DEFAULT.linear {
        return Err(GeometryError::ZeroLengthVector("reference"));
    }
    Ok(Transform::rotation_z(local.y.atan2(local.x)))
}

/// Apply placement and the z-up convention to a freshly built node.
pub(crate) fn finish(mut node: SceneNode, record: &PrimitiveRecord<'_>) -> Result<SceneNode> {
    let placement = record.placement()?;
    node.transform = placement_transform(&placement)?;
    node.up = z_up();
    node.euler_order = EulerOrder::Yxz;
    if node.kind == NodeKind::Mesh {
        node.polygon_offset = Some(PolygonOffset::default());
    }
    Ok(node)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::material::Material;

    /// Run the standard builder for `value` with default parameters.
    pub fn build(value: &Value) -> Result<SceneNode> {
        let mut pool = VectorPool::new();
        let registry = BuilderRegistry::standard();
        let mut ctx = BuildContext::new(&mut pool, TessellationParams::default(), registry);
        let record = PrimitiveRecord::from_value(value).expect("primitive object")?;
        let entry = registry.get(&record.kind).expect("registered kind");
        let material = Material::default();
        (entry.build)(&record, &material, &mut ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::build;
    use super::*;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    #[test]
    fn placement_translates_then_orients() {
        let placement = Placement {
            origin: Some(Coord([1.0, 2.0, 3.0])),
            axis: Some(Coord([1.0, 0.0, 0.0])),
            ..Default::default()
        };
        let t = placement_transform(&placement).unwrap();
        let tip = t.apply_point(&Point3::new(0.0, 0.0, 1.0));
        assert_abs_diff_eq!(tip.x, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(tip.y, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(tip.z, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn z_axis_placement_is_pure_translation() {
        let placement = Placement {
            origin: Some(Coord([0.0, 0.0, 5.0])),
            normal: Some(Coord([0.0, 0.0, 2.0])),
            ..Default::default()
        };
        assert_eq!(
            placement_transform(&placement).unwrap(),
            Transform::translation(0.0, 0.0, 5.0)
        );
    }

    #[test]
    fn zero_orientation_names_field() {
        let placement = Placement {
            direction: Some(Coord([0.0, 0.0, 0.0])),
            ..Default::default()
        };
        assert_eq!(
            placement_transform(&placement).unwrap_err(),
            GeometryError::ZeroLengthVector("direction")
        );
    }

    #[test]
    fn reference_turns_local_x() {
        let placement = Placement {
            reference: Some(Coord([0.0, 1.0, 0.0])),
            ..Default::default()
        };
        let r = reference_rotation(&placement).unwrap();
        let x = r.apply_vec(&flux_math::Vec3::x());
        assert_abs_diff_eq!(x.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn finish_applies_z_up_and_offset() {
        let node = build(&json!({"primitive": "sphere", "radius": 1.0, "origin": [0, 0, 4]})).unwrap();
        assert_eq!(node.up, z_up());
        assert_eq!(node.euler_order, EulerOrder::Yxz);
        assert_eq!(node.polygon_offset, Some(PolygonOffset::default()));
        assert_abs_diff_eq!(node.transform.translation_part().z, 4.0);

        let line = build(&json!({"primitive": "line", "start": [0, 0], "end": [1, 0]})).unwrap();
        assert!(line.polygon_offset.is_none());
    }

    #[test]
    fn member_class_is_checked() {
        let mut pool = VectorPool::new();
        let mut ctx = BuildContext::new(
            &mut pool,
            TessellationParams::default(),
            BuilderRegistry::standard(),
        );
        let sphere = json!({"primitive": "sphere", "radius": 1});
        let err = ctx.build_member("polycurve", EntityClass::Wire, &sphere).unwrap_err();
        assert!(matches!(err, GeometryError::Composition { .. }), "{err}");

        let unknown = json!({"primitive": "teapot"});
        let err = ctx.build_member("polycurve", EntityClass::Wire, &unknown).unwrap_err();
        assert_eq!(err, GeometryError::Unsupported("teapot".into()));

        let err = ctx.build_member("polycurve", EntityClass::Wire, &json!(3)).unwrap_err();
        assert!(matches!(err, GeometryError::InvalidField { .. }));
    }
}
