//! Grid tessellation of parametric surfaces.

use flux_math::Point3;

use crate::FaceMesh;

/// Sample `surface` over the unit square on a `(slices + 1) x (stacks + 1)`
/// grid and connect neighbouring samples with two triangles per cell.
///
/// `surface(u, v)` receives normalized parameters in `[0, 1]`; `u` advances
/// across slices, `v` across stacks.
pub fn tessellate_parametric<F>(surface: F, slices: usize, stacks: usize) -> FaceMesh
where
    F: Fn(f64, f64) -> Point3,
{
    let slices = slices.max(1);
    let stacks = stacks.max(1);

    let mut mesh = FaceMesh::new();
    mesh.vertices.reserve((slices + 1) * (stacks + 1));
    for j in 0..=stacks {
        let v = j as f64 / stacks as f64;
        for i in 0..=slices {
            let u = i as f64 / slices as f64;
            mesh.vertices.push(surface(u, v));
        }
    }

    let stride = (slices + 1) as u32;
    for j in 0..stacks as u32 {
        for i in 0..slices as u32 {
            let a = j * stride + i;
            let b = a + 1;
            let c = a + stride + 1;
            let d = a + stride;
            mesh.faces.push([a, b, d]);
            mesh.faces.push([b, c, d]);
        }
    }
    mesh
}
