//! Sibling merging.
//!
//! Siblings of the same primitive kind that render identically are folded
//! into one node so the renderer issues one draw call instead of many. The
//! guest's geometry is re-expressed in the host's local frame
//! (`host⁻¹ · guest`) so the host keeps its own transform and local
//! coordinates stay meaningful.

use std::sync::Arc;

use tracing::trace;

use crate::node::{NodeKind, SceneNode};

/// A node may take part in a merge when it is a bare leaf with geometry.
///
/// Nodes carrying `attributes` stay separate so they can be addressed and
/// restyled individually.
fn mergeable(node: &SceneNode) -> bool {
    node.kind != NodeKind::Group
        && node.geometry.is_some()
        && node.children.is_empty()
        && node.attributes.is_none()
}

fn compatible(host: &SceneNode, guest: &SceneNode) -> bool {
    match (host.geometry(), guest.geometry()) {
        (Some(h), Some(g)) => {
            host.kind == guest.kind
                && host.primitive == guest.primitive
                && host.material == guest.material
                && h.is_buffer() == g.is_buffer()
        }
        _ => false,
    }
}

/// Fold `guest` into `host`. Returns the guest back when the host's frame
/// cannot take it.
fn fold(host: &mut SceneNode, guest: SceneNode) -> Result<(), SceneNode> {
    let Some(inverse) = host.transform.inverse() else {
        return Err(guest);
    };
    let Some(geometry) = guest.geometry() else {
        return Err(guest);
    };
    let relative = inverse.then(&guest.transform);
    let moved = geometry.transformed(&relative);
    let Some(target) = host.geometry.as_mut() else {
        return Err(guest);
    };
    if !Arc::make_mut(target).merge(&moved) {
        return Err(guest);
    }
    host.merged_ids.extend(guest.id);
    host.merged_ids.extend(guest.merged_ids);
    Ok(())
}

/// Merge compatible siblings, preserving the order of first appearance.
pub fn merge_siblings(children: Vec<SceneNode>) -> Vec<SceneNode> {
    let before = children.len();
    let mut out: Vec<SceneNode> = Vec::with_capacity(before);
    for child in children {
        if !mergeable(&child) {
            out.push(child);
            continue;
        }
        let host = out
            .iter_mut()
            .find(|host| mergeable(host) && compatible(host, &child));
        match host {
            Some(host) => {
                if let Err(child) = fold(host, child) {
                    out.push(child);
                }
            }
            None => out.push(child),
        }
    }
    trace!(children = before, nodes = out.len(), "merged siblings");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Material, MaterialClass};
    use crate::node::Geometry;
    use approx::assert_abs_diff_eq;
    use flux_ir::Attributes;
    use flux_math::Transform;
    use flux_tessellate::box_mesh;

    fn block(x: f64) -> SceneNode {
        let mut node = SceneNode::new(
            NodeKind::Mesh,
            Geometry::Buffer(box_mesh(1.0, 1.0, 1.0)),
            Material::default(),
        );
        node.transform = Transform::translation(x, 0.0, 0.0);
        node
    }

    #[test]
    fn guest_lands_in_host_frame() {
        let mut guest = block(-2.0);
        guest.id = Some("guest".into());
        let merged = merge_siblings(vec![block(1.0), guest]);
        assert_eq!(merged.len(), 1);

        let host = &merged[0];
        assert_eq!(host.merged_ids, vec!["guest".to_string()]);
        assert_eq!(host.transform, Transform::translation(1.0, 0.0, 0.0));
        let (min, max) = host.bounding_box().unwrap();
        assert_abs_diff_eq!(min.x, -3.5, epsilon = 1e-6);
        assert_abs_diff_eq!(max.x, 0.5, epsilon = 1e-6);
        assert_eq!(host.num_vertices(), 48);
    }

    #[test]
    fn attributes_and_materials_keep_nodes_apart() {
        let mut tagged = block(0.0);
        tagged.attributes = Some(Attributes {
            tag: Some("door".into()),
            ..Default::default()
        });
        let mut red = block(0.0);
        red.material = Some(Material {
            color: [1.0, 0.0, 0.0],
            ..Material::for_class(MaterialClass::Surface)
        });
        let merged = merge_siblings(vec![block(0.0), tagged, red, block(0.0)]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].num_vertices(), 48);
    }

    #[test]
    fn different_primitives_stay_apart() {
        let mut cube = block(0.0);
        cube.primitive = Some("block".into());
        let mut ball = SceneNode::new(
            NodeKind::Mesh,
            Geometry::Buffer(flux_tessellate::sphere_mesh(1.0, 8, 4)),
            Material::default(),
        );
        ball.primitive = Some("sphere".into());
        let mut other_cube = block(2.0);
        other_cube.primitive = Some("block".into());

        let merged = merge_siblings(vec![cube, ball, other_cube]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].primitive.as_deref(), Some("block"));
        assert_eq!(merged[0].num_vertices(), 48);
        assert_eq!(merged[1].primitive.as_deref(), Some("sphere"));
    }

    #[test]
    fn shared_geometry_is_copied_on_write() {
        let host = block(0.0);
        let shared = Arc::clone(host.geometry.as_ref().unwrap());
        let merged = merge_siblings(vec![host, block(0.0)]);
        assert_eq!(shared.num_vertices(), 24);
        assert_eq!(merged[0].num_vertices(), 48);
    }

    #[test]
    fn groups_pass_through() {
        let group = SceneNode::group_of(vec![block(0.0)]);
        let merged = merge_siblings(vec![group.clone(), group]);
        assert_eq!(merged.len(), 2);
    }
}
