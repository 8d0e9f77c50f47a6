//! Closed solids as flat buffers with per-vertex normals.
//!
//! Solids are generated centered on the origin in the renderer's native
//! Y-up frame; placing them is left to the caller.

use std::f64::consts::PI;

use flux_math::{Point3, Vec3};

use crate::BufferGeometry;

fn push(mesh: &mut BufferGeometry, p: Point3, n: Vec3) -> u32 {
    let idx = mesh.num_vertices() as u32;
    mesh.push_vertex(&p);
    mesh.normals.extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
    idx
}

/// Axis-aligned box centered at the origin with sides `width` (X), `height`
/// (Y) and `depth` (Z). Each face owns its four corners so normals stay flat.
pub fn box_mesh(width: f64, height: f64, depth: f64) -> BufferGeometry {
    let half = [width / 2.0, height / 2.0, depth / 2.0];
    // (normal axis, sign, u axis, v axis) with u x v == normal
    let faces: [(usize, f64, usize, usize); 6] = [
        (0, 1.0, 1, 2),
        (0, -1.0, 2, 1),
        (1, 1.0, 2, 0),
        (1, -1.0, 0, 2),
        (2, 1.0, 0, 1),
        (2, -1.0, 1, 0),
    ];

    let mut mesh = BufferGeometry::new();
    for (axis, sign, u, v) in faces {
        let mut normal = Vec3::zeros();
        normal[axis] = sign;
        let center = normal * half[axis];

        let mut corners = [0u32; 4];
        for (k, (su, sv)) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
            .into_iter()
            .enumerate()
        {
            let mut p = center;
            p[u] += su * half[u];
            p[v] += sv * half[v];
            corners[k] = push(&mut mesh, Point3::from(p), normal);
        }
        mesh.indices.extend_from_slice(&[corners[0], corners[1], corners[2]]);
        mesh.indices.extend_from_slice(&[corners[0], corners[2], corners[3]]);
    }
    mesh
}

/// UV sphere centered at the origin with poles on the Y axis.
pub fn sphere_mesh(radius: f64, segments: u32, latitude_segments: u32) -> BufferGeometry {
    let n_lon = segments.max(3) as usize;
    let n_lat = latitude_segments.max(2) as usize;

    let mut mesh = BufferGeometry::new();
    for j in 0..=n_lat {
        let theta = PI * j as f64 / n_lat as f64;
        for i in 0..=n_lon {
            let phi = 2.0 * PI * i as f64 / n_lon as f64;
            let n = Vec3::new(theta.sin() * phi.sin(), theta.cos(), theta.sin() * phi.cos());
            push(&mut mesh, Point3::from(n * radius), n);
        }
    }

    let stride = (n_lon + 1) as u32;
    for j in 0..n_lat {
        for i in 0..n_lon {
            let a = j as u32 * stride + i as u32;
            let b = a + stride;
            let c = b + 1;
            let d = a + 1;
            // Pole rows collapse to a point; skip their zero-area halves.
            if j != 0 {
                mesh.indices.extend_from_slice(&[a, b, d]);
            }
            if j != n_lat - 1 {
                mesh.indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    mesh
}

/// Capped frustum centered at the origin, aligned with the Y axis.
///
/// `radius_top` sits at `y = height / 2`, `radius_bottom` at `-height / 2`.
/// A zero radius closes that end to an apex and omits its cap.
pub fn cylinder_mesh(
    radius_top: f64,
    radius_bottom: f64,
    height: f64,
    radial_segments: u32,
    height_segments: u32,
) -> BufferGeometry {
    let n_circ = radial_segments.max(3) as usize;
    let n_height = height_segments.max(1) as usize;
    let half = height / 2.0;
    let slope = if height.abs() > 1e-12 {
        (radius_bottom - radius_top) / height
    } else {
        0.0
    };

    let mut mesh = BufferGeometry::new();
    let mut rows: Vec<Vec<u32>> = Vec::with_capacity(n_height + 1);
    for j in 0..=n_height {
        let t = j as f64 / n_height as f64;
        let y = -half + height * t;
        let r = radius_bottom + (radius_top - radius_bottom) * t;

        let row = (0..=n_circ)
            .map(|i| {
                let u = 2.0 * PI * (i as f64 / n_circ as f64);
                let (s, c) = u.sin_cos();
                let n = Vec3::new(s, slope, c).normalize();
                push(&mut mesh, Point3::new(r * s, y, r * c), n)
            })
            .collect();
        rows.push(row);
    }

    for j in 0..n_height {
        let bot = &rows[j];
        let top = &rows[j + 1];
        for i in 0..n_circ {
            let (bl, br, tl, tr) = (bot[i], bot[i + 1], top[i], top[i + 1]);
            mesh.indices.extend_from_slice(&[bl, br, tl]);
            mesh.indices.extend_from_slice(&[br, tr, tl]);
        }
    }

    if radius_top > 1e-12 {
        append_cap(&mut mesh, radius_top, half, n_circ, false);
    }
    if radius_bottom > 1e-12 {
        append_cap(&mut mesh, radius_bottom, -half, n_circ, true);
    }
    mesh
}

/// Planar disk at height `y`, facing +Y unless `flip`.
fn append_cap(mesh: &mut BufferGeometry, radius: f64, y: f64, segments: usize, flip: bool) {
    let normal = Vec3::new(0.0, if flip { -1.0 } else { 1.0 }, 0.0);
    let center = push(mesh, Point3::new(0.0, y, 0.0), normal);
    let rim: Vec<u32> = (0..=segments)
        .map(|i| {
            let u = 2.0 * PI * (i as f64 / segments as f64);
            push(mesh, Point3::new(radius * u.sin(), y, radius * u.cos()), normal)
        })
        .collect();

    for i in 0..segments {
        if flip {
            mesh.indices.extend_from_slice(&[center, rim[i + 1], rim[i]]);
        } else {
            mesh.indices.extend_from_slice(&[center, rim[i], rim[i + 1]]);
        }
    }
}

/// Torus centered at the origin, its ring lying in the XY plane.
pub fn torus_mesh(
    major_radius: f64,
    minor_radius: f64,
    radial_segments: u32,
    tubular_segments: u32,
) -> BufferGeometry {
    let n_u = radial_segments.max(3) as usize;
    let n_v = tubular_segments.max(3) as usize;

    let mut mesh = BufferGeometry::new();
    for j in 0..=n_v {
        let v = 2.0 * PI * (j as f64 / n_v as f64);
        for i in 0..=n_u {
            let u = 2.0 * PI * (i as f64 / n_u as f64);
            let ring = major_radius + minor_radius * v.cos();
            let p = Point3::new(ring * u.cos(), ring * u.sin(), minor_radius * v.sin());
            let n = Vec3::new(v.cos() * u.cos(), v.cos() * u.sin(), v.sin());
            push(&mut mesh, p, n);
        }
    }

    let stride = (n_u + 1) as u32;
    for j in 0..n_v {
        for i in 0..n_u {
            let bl = j as u32 * stride + i as u32;
            let br = bl + 1;
            let tl = bl + stride;
            let tr = tl + 1;
            mesh.indices.extend_from_slice(&[bl, br, tl, br, tr, tl]);
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Signed volume via the divergence theorem; positive for outward winding.
    fn signed_volume(mesh: &BufferGeometry) -> f64 {
        let p: Vec<Point3> = mesh.positions().collect();
        mesh.indices
            .chunks_exact(3)
            .map(|t| {
                let (a, b, c) = (p[t[0] as usize], p[t[1] as usize], p[t[2] as usize]);
                a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
            })
            .sum()
    }

    #[test]
    fn test_box_counts_and_bounds() {
        let mesh = box_mesh(2.0, 4.0, 6.0);
        assert_eq!(mesh.num_vertices(), 24);
        assert_eq!(mesh.num_triangles(), 12);
        assert_eq!(mesh.normals.len(), mesh.vertices.len());
        let (min, max) = mesh.bounding_box().unwrap();
        assert_abs_diff_eq!(min.x, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(max.y, 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(max.z, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_box_winding_outward() {
        let mesh = box_mesh(1.0, 1.0, 1.0);
        assert_abs_diff_eq!(signed_volume(&mesh), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_on_radius() {
        let mesh = sphere_mesh(2.0, 32, 16);
        assert_eq!(mesh.num_vertices(), 33 * 17);
        assert_eq!(mesh.num_triangles(), 2 * 32 * 16 - 2 * 32);
        for p in mesh.positions() {
            assert_abs_diff_eq!(p.coords.norm(), 2.0, epsilon = 1e-5);
        }
        let volume = signed_volume(&mesh);
        let exact = 4.0 / 3.0 * PI * 8.0;
        assert!(volume > 0.9 * exact && volume <= exact, "volume {volume}");
    }

    #[test]
    fn test_cylinder_volume_and_caps() {
        let mesh = cylinder_mesh(1.0, 1.0, 2.0, 64, 1);
        let volume = signed_volume(&mesh);
        assert!((volume - 2.0 * PI).abs() < 0.05, "volume {volume}");
        let (min, max) = mesh.bounding_box().unwrap();
        assert_abs_diff_eq!(min.y, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(max.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cone_apex_has_no_cap() {
        let cone = cylinder_mesh(0.0, 1.0, 1.0, 16, 1);
        let frustum = cylinder_mesh(0.5, 1.0, 1.0, 16, 1);
        // Side (2 rows of 17) + one cap (center + 17 rim)
        assert_eq!(cone.num_vertices(), 34 + 18);
        assert_eq!(frustum.num_vertices(), 34 + 36);
        assert!(signed_volume(&cone) > 0.0);
    }

    #[test]
    fn test_torus_extent() {
        let mesh = torus_mesh(3.0, 1.0, 32, 16);
        let (min, max) = mesh.bounding_box().unwrap();
        assert_abs_diff_eq!(max.x, 4.0, epsilon = 1e-5);
        assert_abs_diff_eq!(max.z, 1.0, epsilon = 0.05);
        assert_abs_diff_eq!(min.z, -1.0, epsilon = 0.05);
        assert!(signed_volume(&mesh) > 0.0);
    }
}
