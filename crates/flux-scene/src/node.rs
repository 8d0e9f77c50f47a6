//! Scene graph produced by a build.

use std::sync::Arc;

use flux_ir::Attributes;
use flux_math::{EulerOrder, Transform, Vec3};
use flux_tessellate::{Bounds, BufferGeometry, FaceMesh};

use crate::material::Material;

/// Renderable type of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Shaded triangles.
    Mesh,
    /// Line segments.
    Line,
    /// Point cloud.
    Points,
    /// Container without geometry of its own.
    Group,
}

/// Geometry attached to a node, in either representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Editable vertex/face mesh, converted to buffers before output.
    Faces(FaceMesh),
    /// Flat GPU-ready buffers.
    Buffer(BufferGeometry),
}

impl Geometry {
    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        match self {
            Geometry::Faces(m) => m.num_vertices(),
            Geometry::Buffer(b) => b.num_vertices(),
        }
    }

    /// Local-space bounds.
    pub fn bounding_box(&self) -> Option<Bounds> {
        match self {
            Geometry::Faces(m) => m.bounding_box(),
            Geometry::Buffer(b) => b.bounding_box(),
        }
    }

    /// True for the flat buffer representation.
    pub fn is_buffer(&self) -> bool {
        matches!(self, Geometry::Buffer(_))
    }

    /// The flat buffers, if already in that representation.
    pub fn as_buffer(&self) -> Option<&BufferGeometry> {
        match self {
            Geometry::Buffer(b) => Some(b),
            Geometry::Faces(_) => None,
        }
    }

    /// Copy with `transform` applied to every vertex.
    pub fn transformed(&self, transform: &Transform) -> Self {
        match self {
            Geometry::Faces(m) => Geometry::Faces(m.transformed(transform)),
            Geometry::Buffer(b) => Geometry::Buffer(b.transformed(transform)),
        }
    }

    /// Convert to flat buffers.
    pub fn into_buffer(self) -> BufferGeometry {
        match self {
            Geometry::Faces(m) => m.to_buffer(),
            Geometry::Buffer(b) => b,
        }
    }

    /// Append `other`. Returns `false`, leaving `self` untouched, when the
    /// representations differ.
    pub fn merge(&mut self, other: &Geometry) -> bool {
        match (self, other) {
            (Geometry::Faces(a), Geometry::Faces(b)) => a.merge(b),
            (Geometry::Buffer(a), Geometry::Buffer(b)) => a.merge(b),
            _ => return false,
        }
        true
    }

    /// Combine several parts into one geometry, staying in the editable
    /// representation only when every part is in it.
    pub fn combine(parts: Vec<Geometry>) -> Geometry {
        if parts.iter().all(|g| !g.is_buffer()) {
            let mut mesh = FaceMesh::new();
            for part in &parts {
                if let Geometry::Faces(m) = part {
                    mesh.merge(m);
                }
            }
            Geometry::Faces(mesh)
        } else {
            let mut buffer = BufferGeometry::new();
            for part in parts {
                buffer.merge(&part.into_buffer());
            }
            Geometry::Buffer(buffer)
        }
    }
}

/// Depth offset applied to shaded surfaces so coplanar faces do not fight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonOffset {
    /// Slope-scaled factor.
    pub factor: f32,
    /// Constant units.
    pub units: f32,
}

impl Default for PolygonOffset {
    fn default() -> Self {
        Self {
            factor: 1.0,
            units: 1.0,
        }
    }
}

/// One node of the output scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Renderable type.
    pub kind: NodeKind,
    /// User-supplied id of the element this node was built from.
    pub id: Option<String>,
    /// Ids of siblings whose geometry was merged into this node.
    pub merged_ids: Vec<String>,
    /// Entity-map key, when built from one.
    pub name: Option<String>,
    /// Canonical primitive name.
    pub primitive: Option<String>,
    /// Geometry, shared between nodes when instanced.
    pub geometry: Option<Arc<Geometry>>,
    /// Material used to build the node. `None` for groups.
    pub material: Option<Material>,
    /// Attributes of the source element.
    pub attributes: Option<Attributes>,
    /// Local transform relative to the parent.
    pub transform: Transform,
    /// Up axis convention of the node.
    pub up: Vec3,
    /// Euler order for rotations edited downstream.
    pub euler_order: EulerOrder,
    /// Depth offset for shaded meshes.
    pub polygon_offset: Option<PolygonOffset>,
    /// Child nodes.
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// A leaf node holding `geometry`.
    pub fn new(kind: NodeKind, geometry: Geometry, material: Material) -> Self {
        Self {
            kind,
            geometry: Some(Arc::new(geometry)),
            material: Some(material),
            ..Self::group()
        }
    }

    /// An empty group.
    pub fn group() -> Self {
        Self {
            kind: NodeKind::Group,
            id: None,
            merged_ids: Vec::new(),
            name: None,
            primitive: None,
            geometry: None,
            material: None,
            attributes: None,
            transform: Transform::identity(),
            up: Vec3::y(),
            euler_order: EulerOrder::default(),
            polygon_offset: None,
            children: Vec::new(),
        }
    }

    /// A group over `children`.
    pub fn group_of(children: Vec<SceneNode>) -> Self {
        Self {
            children,
            ..Self::group()
        }
    }

    /// Geometry, if any.
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_deref()
    }

    /// Number of vertices in this node's own geometry.
    pub fn num_vertices(&self) -> usize {
        self.geometry().map_or(0, Geometry::num_vertices)
    }

    /// Local-space bounds of this node's own geometry.
    pub fn bounding_box(&self) -> Option<Bounds> {
        self.geometry().and_then(Geometry::bounding_box)
    }

    /// Depth-first search for a node by id, including ids merged into it.
    pub fn find_by_id(&self, id: &str) -> Option<&SceneNode> {
        if self.id.as_deref() == Some(id) || self.merged_ids.iter().any(|m| m == id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_by_id(id))
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(SceneNode::count_nodes).sum::<usize>()
    }

    /// Visit every node depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a SceneNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flux_math::Point3;

    fn line() -> SceneNode {
        SceneNode::new(
            NodeKind::Line,
            Geometry::Buffer(BufferGeometry::line_strip(&[
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
            ])),
            Material::default(),
        )
    }

    #[test]
    fn find_by_id_searches_merged_ids() {
        let mut a = line();
        a.id = Some("a".into());
        a.merged_ids.push("b".into());
        let root = SceneNode::group_of(vec![SceneNode::group_of(vec![a])]);

        assert_eq!(root.find_by_id("b").and_then(|n| n.id.as_deref()), Some("a"));
        assert!(root.find_by_id("c").is_none());
        assert_eq!(root.count_nodes(), 3);
    }

    #[test]
    fn merge_requires_same_representation() {
        let mut faces = Geometry::Faces(FaceMesh::new());
        let buffer = Geometry::Buffer(BufferGeometry::new());
        assert!(!faces.merge(&buffer));
        assert!(faces.merge(&Geometry::Faces(FaceMesh::new())));
    }

    #[test]
    fn combine_mixed_parts_upgrades() {
        let faces = Geometry::Faces(FaceMesh {
            vertices: vec![
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![[0, 1, 2]],
        });
        let combined = Geometry::combine(vec![faces.clone(), faces.clone()]);
        assert!(!combined.is_buffer());
        assert_eq!(combined.num_vertices(), 6);

        let mixed = Geometry::combine(vec![faces, Geometry::Buffer(BufferGeometry::new())]);
        assert!(mixed.is_buffer());
        assert_eq!(mixed.num_vertices(), 3);
    }
}
