//! Solid builders: analytic primitives, explicit meshes and breps.
//!
//! Analytic solids come from the tessellators in `flux-tessellate`, which
//! build them centered and y-aligned. Cylinders and cones are re-seated here
//! so they rise from the origin along +Z, with that placement baked into the
//! vertices rather than left on the node.

use std::f64::consts::FRAC_PI_2;

use flux_ir::{
    BlockRecord, BrepRecord, ConeRecord, CylinderRecord, MeshRecord, PrimitiveRecord,
    SphereRecord, TorusRecord,
};
use flux_math::{Point3, Transform};
use flux_tessellate::{box_mesh, cylinder_mesh, sphere_mesh, torus_mesh, BufferGeometry, FaceMesh};

use super::{finish, point, positive, BuildContext};
use crate::error::{GeometryError, Result};
use crate::material::Material;
use crate::node::{Geometry, NodeKind, SceneNode};

fn mesh_node(geometry: Geometry, material: &Material) -> SceneNode {
    SceneNode::new(NodeKind::Mesh, geometry, *material)
}

/// Stand a y-aligned, centered solid of `height` on the XY plane, rising along +Z.
fn seat_on_z(geometry: &BufferGeometry, height: f64) -> BufferGeometry {
    let seat = Transform::translation(0.0, 0.0, height / 2.0).then(&Transform::rotation_x(FRAC_PI_2));
    geometry.transformed(&seat)
}

pub(crate) fn build_block(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    _ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: BlockRecord = record.parse()?;
    let [w, h, d] = rec.dimensions.0;
    let w = positive(&record.kind, "dimensions[0]", w)?;
    let h = positive(&record.kind, "dimensions[1]", h)?;
    let d = positive(&record.kind, "dimensions[2]", d)?;
    finish(
        mesh_node(Geometry::Buffer(box_mesh(w, h, d)), material),
        record,
    )
}

pub(crate) fn build_sphere(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: SphereRecord = record.parse()?;
    let radius = positive(&record.kind, "radius", rec.radius)?;
    let mesh = sphere_mesh(
        radius,
        ctx.params.circle_segments,
        ctx.params.latitude_segments,
    );
    finish(mesh_node(Geometry::Buffer(mesh), material), record)
}

pub(crate) fn build_cylinder(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: CylinderRecord = record.parse()?;
    let radius = positive(&record.kind, "radius", rec.radius)?;
    let height = positive(&record.kind, "height", rec.height)?;
    let mesh = cylinder_mesh(
        radius,
        radius,
        height,
        ctx.params.circle_segments,
        ctx.params.height_segments,
    );
    finish(
        mesh_node(Geometry::Buffer(seat_on_z(&mesh, height)), material),
        record,
    )
}

pub(crate) fn build_cone(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: ConeRecord = record.parse()?;
    let radius = positive(&record.kind, "radius", rec.radius)?;
    let height = positive(&record.kind, "height", rec.height)?;
    if !(0.0..90.0).contains(&rec.semi_angle) {
        return Err(GeometryError::invalid(
            &record.kind,
            format!("`semiAngle` must be in [0, 90) degrees, got {}", rec.semi_angle),
        ));
    }
    let top = (radius - height * rec.semi_angle.to_radians().tan()).max(0.0);
    let mesh = cylinder_mesh(
        top,
        radius,
        height,
        ctx.params.circle_segments,
        ctx.params.height_segments,
    );
    finish(
        mesh_node(Geometry::Buffer(seat_on_z(&mesh, height)), material),
        record,
    )
}

pub(crate) fn build_torus(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: TorusRecord = record.parse()?;
    let major = positive(&record.kind, "majorRadius", rec.major_radius)?;
    let minor = positive(&record.kind, "minorRadius", rec.minor_radius)?;
    let mesh = torus_mesh(
        major,
        minor,
        ctx.params.circle_segments,
        ctx.params.latitude_segments,
    );
    finish(mesh_node(Geometry::Buffer(mesh), material), record)
}

/// Index-checked mesh from explicit vertices and polygon faces.
///
/// Faces with more than three corners are fanned from their first corner.
pub(crate) fn face_mesh(primitive: &str, vertices: Vec<Point3>, faces: &[Vec<u32>]) -> Result<FaceMesh> {
    let count = vertices.len();
    let mut mesh = FaceMesh {
        vertices,
        faces: Vec::with_capacity(faces.len()),
    };
    for (index, face) in faces.iter().enumerate() {
        if face.len() < 3 {
            return Err(GeometryError::invalid(
                primitive,
                format!("face {index} has {} corners, need at least 3", face.len()),
            ));
        }
        if let Some(bad) = face.iter().find(|&&i| i as usize >= count) {
            return Err(GeometryError::invalid(
                primitive,
                format!("face {index} references vertex {bad}, only {count} vertices"),
            ));
        }
        for k in 1..face.len() - 1 {
            mesh.faces.push([face[0], face[k], face[k + 1]]);
        }
    }
    Ok(mesh)
}

pub(crate) fn build_mesh(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    _ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: MeshRecord = record.parse()?;
    let vertices = rec.vertices.iter().map(point).collect();
    let mesh = face_mesh(&record.kind, vertices, &rec.faces)?;
    finish(mesh_node(Geometry::Faces(mesh), material), record)
}

/// Breps need geometry fetched ahead of time; see [`crate::brep`].
pub(crate) fn build_brep(
    record: &PrimitiveRecord<'_>,
    material: &Material,
    ctx: &mut BuildContext<'_>,
) -> Result<SceneNode> {
    let rec: BrepRecord = record.parse()?;
    let cache = ctx.breps.ok_or(GeometryError::BrepUnresolved)?;
    let geometry = cache.lookup(&rec.format, &rec.content)?;
    let mut node = SceneNode::group();
    node.kind = NodeKind::Mesh;
    node.geometry = Some(geometry);
    node.material = Some(*material);
    finish(node, record)
}
