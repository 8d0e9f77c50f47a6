//! Planar polygon triangulation.
//!
//! A polygon is a closed boundary loop plus any number of hole loops, all
//! lying in one plane. The plane basis comes from the first boundary points;
//! every point is checked against it, projected to 2D, bridged into a single
//! loop and ear-clipped. Output vertices are re-embedded in 3D so the mesh
//! sits exactly where the input did.

use flux_math::{Point3, Tolerance, Vec3, VectorPool};

use crate::{FaceMesh, Result, TessellateError};

/// Maximum distance a point may lie from the boundary plane.
pub const PLANARITY_TOLERANCE: f64 = 1e-6;

/// A planar polygon with optional holes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    /// Outer loop.
    pub boundary: Vec<Point3>,
    /// Inner loops cut out of the boundary.
    pub holes: Vec<Vec<Point3>>,
}

impl Polygon {
    /// Polygon without holes.
    pub fn new(boundary: Vec<Point3>) -> Self {
        Self {
            boundary,
            holes: Vec::new(),
        }
    }

    /// Add a hole loop.
    pub fn with_hole(mut self, hole: Vec<Point3>) -> Self {
        self.holes.push(hole);
        self
    }
}

/// Plane frame derived from a boundary loop.
struct PlaneBasis {
    origin: Point3,
    u: Vec3,
    v: Vec3,
    normal: Vec3,
}

impl PlaneBasis {
    fn project(&self, p: &Point3) -> (f64, f64) {
        let d = p - self.origin;
        (d.dot(&self.u), d.dot(&self.v))
    }

    fn embed(&self, (s, t): (f64, f64)) -> Point3 {
        self.origin + self.u * s + self.v * t
    }
}

/// Drop a trailing point that repeats the first one.
fn open_loop(points: &[Point3]) -> &[Point3] {
    let tol = Tolerance::DEFAULT;
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() > 1 && tol.points_equal(first, last) => {
            &points[..points.len() - 1]
        }
        _ => points,
    }
}

fn newell_normal(points: &[Point3]) -> Vec3 {
    let mut n = Vec3::zeros();
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

fn plane_basis(boundary: &[Point3], pool: &mut VectorPool) -> Result<PlaneBasis> {
    let origin = boundary[0];
    let first = pool.alloc(boundary[1] - origin);
    let last = pool.alloc(boundary[boundary.len() - 1] - origin);

    if pool[first].norm() < Tolerance::DEFAULT.linear {
        return Err(TessellateError::DegeneratePolygon(
            "first boundary edge has zero length".into(),
        ));
    }
    let u = pool[first].normalize();

    let first_cross_last = u.cross(&pool[last]);
    let cross = pool.alloc(first_cross_last);
    let normal = if pool[cross].norm() > Tolerance::DEFAULT.linear {
        pool[cross].normalize()
    } else {
        // First and last edges are collinear; fall back to the loop normal.
        let n = pool.alloc(newell_normal(boundary));
        if pool[n].norm() < Tolerance::DEFAULT.linear {
            return Err(TessellateError::DegeneratePolygon(
                "boundary has zero area".into(),
            ));
        }
        pool[n].normalize()
    };
    let v = normal.cross(&u);

    Ok(PlaneBasis {
        origin,
        u,
        v,
        normal,
    })
}

fn signed_area_2d(points: &[(f64, f64)]) -> f64 {
    let mut area = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        area += a.0 * b.1 - b.0 * a.1;
    }
    area * 0.5
}

/// Triangulate a single planar polygon with holes.
///
/// Fails with [`TessellateError::NonPlanar`] when any boundary or hole point
/// is farther than [`PLANARITY_TOLERANCE`] from the boundary plane.
pub fn triangulate_polygon(polygon: &Polygon, pool: &mut VectorPool) -> Result<FaceMesh> {
    let boundary = open_loop(&polygon.boundary);
    if boundary.len() < 3 {
        return Err(TessellateError::DegeneratePolygon(format!(
            "boundary needs at least 3 points, got {}",
            boundary.len()
        )));
    }
    let basis = plane_basis(boundary, pool)?;

    let holes: Vec<&[Point3]> = polygon
        .holes
        .iter()
        .map(|h| open_loop(h))
        .filter(|h| h.len() >= 3)
        .collect();

    let all_points = boundary.iter().chain(holes.iter().flat_map(|h| h.iter()));
    for (index, p) in all_points.enumerate() {
        let distance = (p - basis.origin).dot(&basis.normal).abs();
        if distance > PLANARITY_TOLERANCE {
            return Err(TessellateError::NonPlanar { index, distance });
        }
    }

    // Outer loop counter-clockwise, holes clockwise.
    let mut outer_2d: Vec<(f64, f64)> = boundary.iter().map(|p| basis.project(p)).collect();
    if signed_area_2d(&outer_2d) < 0.0 {
        outer_2d.reverse();
    }
    let inner_2d: Vec<Vec<(f64, f64)>> = holes
        .iter()
        .map(|h| {
            let mut ring: Vec<(f64, f64)> = h.iter().map(|p| basis.project(p)).collect();
            if signed_area_2d(&ring) > 0.0 {
                ring.reverse();
            }
            ring
        })
        .collect();

    let (verts_2d, loop_indices) = bridge_holes(&outer_2d, &inner_2d);

    let mut mesh = FaceMesh::new();
    mesh.vertices = verts_2d.iter().map(|&p| basis.embed(p)).collect();
    ear_clip_triangulate(&verts_2d, &loop_indices, &mut mesh.faces);
    Ok(mesh)
}

/// Triangulate every polygon of a set into one mesh.
pub fn triangulate_polygon_set(polygons: &[Polygon], pool: &mut VectorPool) -> Result<FaceMesh> {
    let mut mesh = FaceMesh::new();
    for polygon in polygons {
        mesh.merge(&triangulate_polygon(polygon, pool)?);
    }
    Ok(mesh)
}

/// Merge the outer loop and all holes into one vertex array and a single
/// index loop, connecting each hole to the closest loop vertex by a
/// doubled bridge edge.
fn bridge_holes(
    outer_2d: &[(f64, f64)],
    inner_2d: &[Vec<(f64, f64)>],
) -> (Vec<(f64, f64)>, Vec<usize>) {
    let mut all_verts: Vec<(f64, f64)> = outer_2d.to_vec();
    let mut inner_starts = Vec::with_capacity(inner_2d.len());
    for ring in inner_2d {
        inner_starts.push(all_verts.len());
        all_verts.extend_from_slice(ring);
    }

    let mut poly: Vec<usize> = (0..outer_2d.len()).collect();
    for (ring, &start) in inner_2d.iter().zip(&inner_starts) {
        let len = ring.len();

        let mut best: Option<(f64, usize, usize)> = None;
        for i in 0..len {
            let inner_pt = all_verts[start + i];
            for (j, &outer_idx) in poly.iter().enumerate() {
                let outer_pt = all_verts[outer_idx];
                let dist = (outer_pt.0 - inner_pt.0).powi(2) + (outer_pt.1 - inner_pt.1).powi(2);
                if best.map_or(true, |(d, _, _)| dist < d) {
                    best = Some((dist, i, j));
                }
            }
        }
        let Some((_, best_inner, best_outer)) = best else {
            continue;
        };

        let hole_indices: Vec<usize> = (0..len).map(|k| start + (best_inner + k) % len).collect();
        let bridge_outer = poly[best_outer];
        let bridge_inner = hole_indices[0];

        let mut merged = Vec::with_capacity(poly.len() + len + 2);
        merged.extend_from_slice(&poly[..=best_outer]);
        merged.extend_from_slice(&hole_indices);
        merged.push(bridge_inner);
        merged.push(bridge_outer);
        merged.extend_from_slice(&poly[best_outer + 1..]);
        poly = merged;
    }

    (all_verts, poly)
}

/// Ear-clipping over a counter-clockwise index loop.
fn ear_clip_triangulate(verts_2d: &[(f64, f64)], indices: &[usize], out: &mut Vec<[u32; 3]>) {
    if indices.len() < 3 {
        return;
    }

    let mut remaining: Vec<usize> = indices.to_vec();
    while remaining.len() > 3 {
        let n = remaining.len();
        let mut found_ear = false;

        for i in 0..n {
            let prev = (i + n - 1) % n;
            let next = (i + 1) % n;

            let a = verts_2d[remaining[prev]];
            let b = verts_2d[remaining[i]];
            let c = verts_2d[remaining[next]];

            let cross = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
            if cross <= 0.0 {
                continue;
            }

            // Bridge duplicates share coordinates with a corner and never block an ear.
            let blocked = (0..n).filter(|&j| j != prev && j != i && j != next).any(|j| {
                let p = verts_2d[remaining[j]];
                p != a && p != b && p != c && point_in_triangle_2d(p, a, b, c)
            });

            if !blocked {
                out.push([
                    remaining[prev] as u32,
                    remaining[i] as u32,
                    remaining[next] as u32,
                ]);
                remaining.remove(i);
                found_ear = true;
                break;
            }
        }

        if !found_ear {
            break;
        }
    }

    if remaining.len() == 3 {
        out.push([
            remaining[0] as u32,
            remaining[1] as u32,
            remaining[2] as u32,
        ]);
    }
}

/// Barycentric containment test, inclusive of the triangle edges.
fn point_in_triangle_2d(p: (f64, f64), a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    let v0 = (c.0 - a.0, c.1 - a.1);
    let v1 = (b.0 - a.0, b.1 - a.1);
    let v2 = (p.0 - a.0, p.1 - a.1);

    let dot00 = v0.0 * v0.0 + v0.1 * v0.1;
    let dot01 = v0.0 * v1.0 + v0.1 * v1.1;
    let dot02 = v0.0 * v2.0 + v0.1 * v2.1;
    let dot11 = v1.0 * v1.0 + v1.1 * v1.1;
    let dot12 = v1.0 * v2.0 + v1.1 * v2.1;

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < f64::EPSILON {
        return false;
    }
    let inv_denom = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;

    let eps = 1e-10;
    u >= -eps && v >= -eps && (u + v) <= 1.0 + eps
}
