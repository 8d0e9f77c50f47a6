//! Three-point circular arc reconstruction.
//!
//! Given start, middle and end points the circle through all three is found
//! by intersecting the perpendicular bisectors of the two chords, then the
//! arc from start to end passing near middle is sampled at a fixed angular
//! resolution.

use std::f64::consts::PI;

use flux_math::{Point3, PoolVec, VectorPool};

use crate::{Result, TessellateError};

/// Angular resolution: segments per full turn.
pub const ARC_SEGMENTS_PER_CIRCLE: f64 = 42.0;

const DEGENERATE_EPS: f64 = 1e-6;

/// Axis pairs tried when intersecting the bisectors, in priority order.
const AXIS_PAIRS: [(usize, usize); 3] = [(0, 1), (0, 2), (1, 2)];

/// Sample the arc through `start`, `middle` and `end`.
///
/// Degenerate input (coincident points or collinear chords) yields exactly
/// the three input points. Otherwise the result starts at `start`, ends at
/// `end`, and contains `ceil(sweep * 42 / 2π) + 1` points.
pub fn arc_points(
    start: &Point3,
    middle: &Point3,
    end: &Point3,
    pool: &mut VectorPool,
) -> Result<Vec<Point3>> {
    let ab = pool.alloc(middle - start);
    let bc = pool.alloc(end - middle);

    let Some(center) = circle_center(start, middle, ab, bc, pool) else {
        return Ok(vec![*start, *middle, *end]);
    };

    let to_start = pool.alloc(start - center);
    let to_end = pool.alloc(end - center);
    let radius = pool[to_start].norm();
    if radius < DEGENERATE_EPS {
        return Ok(vec![*start, *middle, *end]);
    }

    let cos_central = pool[to_start].normalize().dot(&pool[to_end].normalize());
    let central = cos_central.clamp(-1.0, 1.0).acos();

    // The interior angle at `middle` is acute exactly when middle lies on the
    // major arc, so the sweep is the reflex complement.
    let m_to_start = pool.alloc(start - middle);
    let m_to_end = pool.alloc(end - middle);
    let cos_interior = pool[m_to_start].normalize().dot(&pool[m_to_end].normalize());
    let interior = cos_interior.clamp(-1.0, 1.0).acos();
    let sweep = if interior < PI / 2.0 {
        2.0 * PI - central
    } else {
        central
    };

    // In-plane basis: x toward start, y a quarter turn along the travel direction.
    let plane_normal = pool[ab].cross(&pool[bc]);
    let normal = pool.alloc(plane_normal);
    let x_axis = pool[to_start] / radius;
    let y_axis = pool[normal].normalize().cross(&x_axis);

    let segments = ((sweep * ARC_SEGMENTS_PER_CIRCLE / (2.0 * PI)).ceil() as usize).max(1);
    let mut points = Vec::with_capacity(segments + 1);
    for i in 0..=segments {
        let theta = sweep * i as f64 / segments as f64;
        let (s, c) = theta.sin_cos();
        points.push(center + x_axis * (radius * c) + y_axis * (radius * s));
    }
    if let Some(last) = points.last_mut() {
        *last = *end;
    }

    if points.is_empty() {
        return Err(TessellateError::ArcNoVertices);
    }
    Ok(points)
}

/// Circle center from the bisector intersection, or `None` when the input is
/// degenerate or no axis pair gives a finite solution.
fn circle_center(
    start: &Point3,
    middle: &Point3,
    ab: PoolVec,
    bc: PoolVec,
    pool: &mut VectorPool,
) -> Option<Point3> {
    let ab_len = pool[ab].norm();
    let bc_len = pool[bc].norm();
    if ab_len < DEGENERATE_EPS || bc_len < DEGENERATE_EPS {
        return None;
    }
    let alignment = (pool[ab] / ab_len).dot(&(pool[bc] / bc_len)).abs();
    if 1.0 - alignment < DEGENERATE_EPS {
        return None;
    }

    let plane_normal = pool[ab].cross(&pool[bc]);
    let m1 = start + pool[ab] * 0.5;
    let m2 = middle + pool[bc] * 0.5;
    let bisector_ab = plane_normal.cross(&pool[ab]);
    let bisector_bc = plane_normal.cross(&pool[bc]);
    let d1 = pool.alloc(bisector_ab);
    let d2 = pool.alloc(bisector_bc);

    // Solve m1 + t*d1 = m2 + s*d2 on two coordinates. Keep the best-conditioned
    // finite solution; ties go to the earlier pair.
    let mut best: Option<(f64, f64)> = None;
    for (i, j) in AXIS_PAIRS {
        let (a, b) = (pool[d1][i], -pool[d2][i]);
        let (c, d) = (pool[d1][j], -pool[d2][j]);
        let (e, f) = (m2[i] - m1[i], m2[j] - m1[j]);
        let det = a * d - b * c;
        if det.abs() < f64::EPSILON {
            continue;
        }
        let t = (e * d - b * f) / det;
        if !t.is_finite() {
            continue;
        }
        if best.map_or(true, |(best_det, _)| det.abs() > best_det) {
            best = Some((det.abs(), t));
        }
    }

    let (_, t) = best?;
    let center = m1 + pool[d1] * t;
    center.iter().all(|c| c.is_finite()).then_some(center)
}

/// Sample a full ellipse in its local XY plane, closed (last point repeats the first).
pub fn ellipse_points(major_radius: f64, minor_radius: f64, segments: u32) -> Vec<Point3> {
    let segments = segments.max(3);
    (0..=segments)
        .map(|i| {
            let theta = 2.0 * PI * (i % segments) as f64 / segments as f64;
            Point3::new(major_radius * theta.cos(), minor_radius * theta.sin(), 0.0)
        })
        .collect()
}

/// Sample a full circle in its local XY plane, closed.
pub fn circle_points(radius: f64, segments: u32) -> Vec<Point3> {
    ellipse_points(radius, radius, segments)
}
