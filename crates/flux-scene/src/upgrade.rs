//! Conversion of editable geometry to flat buffers.

use std::collections::HashMap;
use std::sync::Arc;

use crate::node::{Geometry, SceneNode};

/// Convert every `Faces` geometry in the subtree to `Buffer`.
///
/// Geometry shared between nodes is converted once and stays shared.
pub fn upgrade_geometry(node: &mut SceneNode) {
    let mut converted = HashMap::new();
    upgrade_with(node, &mut converted);
}

fn upgrade_with(node: &mut SceneNode, converted: &mut HashMap<*const Geometry, Arc<Geometry>>) {
    if let Some(geometry) = node.geometry.as_mut() {
        if !geometry.is_buffer() {
            let key = Arc::as_ptr(geometry);
            let upgraded = converted
                .entry(key)
                .or_insert_with(|| Arc::new(Geometry::Buffer(geometry.as_ref().clone().into_buffer())));
            *geometry = Arc::clone(upgraded);
        }
    }
    for child in &mut node.children {
        upgrade_with(child, converted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::node::NodeKind;
    use flux_math::Point3;
    use flux_tessellate::FaceMesh;

    fn triangle() -> Geometry {
        Geometry::Faces(FaceMesh {
            vertices: vec![
                Point3::origin(),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            faces: vec![[0, 1, 2]],
        })
    }

    #[test]
    fn nested_faces_become_buffers() {
        let leaf = SceneNode::new(NodeKind::Mesh, triangle(), Material::default());
        let mut root = SceneNode::group_of(vec![SceneNode::group_of(vec![leaf])]);
        upgrade_geometry(&mut root);
        let upgraded = root.children[0].children[0].geometry().unwrap();
        let buffer = upgraded.as_buffer().unwrap();
        assert_eq!(buffer.num_triangles(), 1);
        assert_eq!(buffer.normals.len(), 9);
    }

    #[test]
    fn shared_geometry_stays_shared() {
        let a = SceneNode::new(NodeKind::Mesh, triangle(), Material::default());
        let mut b = a.clone();
        b.id = Some("b".into());
        let mut root = SceneNode::group_of(vec![a, b]);
        upgrade_geometry(&mut root);
        let ga = root.children[0].geometry.as_ref().unwrap();
        let gb = root.children[1].geometry.as_ref().unwrap();
        assert!(ga.is_buffer());
        assert!(Arc::ptr_eq(ga, gb));
    }
}
