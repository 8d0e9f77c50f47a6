#![warn(missing_docs)]

//! Rational B-spline (NURBS) evaluation for the Flux scene pipeline.
//!
//! Curves and surfaces are evaluated in homogeneous `(wx, wy, wz, w)` space
//! with De Boor basis functions and projected back to Cartesian coordinates.
//! Construction validates the knot vectors up front: a malformed knot vector is
//! a [`NurbsError`], never a best-effort evaluation.
//!
//! # Key types
//!
//! - [`WeightedPoint`] - control point with a weight (defaults to 1)
//! - [`NurbsCurve`] - rational curve, sampled with [`NurbsCurve::sample`]
//! - [`NurbsSurface`] - rational tensor-product surface, evaluated over the
//!   unit square with [`NurbsSurface::eval_normalized`]

use flux_math::Point3;
use thiserror::Error;

/// Samples per control point per degree used when rendering a curve or surface.
pub const SAMPLES_PER_SPAN: usize = 4;

/// Errors raised while constructing a NURBS entity.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NurbsError {
    /// Knot count does not equal `control points + degree + 1`.
    #[error(
        "{direction} knot vector has {actual} knots, expected {expected} \
         ({control_points} control points + degree {degree} + 1)"
    )]
    KnotCount {
        /// Which knot vector (`curve`, `u`, or `v`).
        direction: &'static str,
        /// Number of knots supplied.
        actual: usize,
        /// Number of knots required.
        expected: usize,
        /// Number of control points along this direction.
        control_points: usize,
        /// Polynomial degree along this direction.
        degree: usize,
    },

    /// Knot values decrease somewhere in the vector.
    #[error("{direction} knot vector decreases at index {index}")]
    DecreasingKnots {
        /// Which knot vector.
        direction: &'static str,
        /// First index whose value is smaller than its predecessor.
        index: usize,
    },

    /// Degree zero or fewer control points than `degree + 1`.
    #[error("{direction} degree {degree} needs more than {degree} control points, got {actual}")]
    TooFewControlPoints {
        /// Which direction.
        direction: &'static str,
        /// Polynomial degree.
        degree: usize,
        /// Number of control points supplied.
        actual: usize,
    },

    /// Degree so large that the required knot count is not representable.
    #[error("{direction} degree {degree} is out of range")]
    DegreeTooLarge {
        /// Which direction.
        direction: &'static str,
        /// Polynomial degree supplied.
        degree: usize,
    },

    /// Degree must be at least 1.
    #[error("{direction} degree must be at least 1")]
    ZeroDegree {
        /// Which direction.
        direction: &'static str,
    },

    /// The parameter domain `[knots[degree], knots[n]]` is empty.
    #[error("{direction} knot vector spans an empty parameter domain")]
    EmptyDomain {
        /// Which direction.
        direction: &'static str,
    },

    /// A weight is zero, negative or not finite.
    #[error("control point {index} has non-positive weight {weight}")]
    InvalidWeight {
        /// Flat index of the offending control point.
        index: usize,
        /// The weight supplied.
        weight: f64,
    },

    /// Surface control grid rows differ in length.
    #[error("control grid row {row} has {actual} points, expected {expected}")]
    RaggedGrid {
        /// Row index.
        row: usize,
        /// Points in that row.
        actual: usize,
        /// Points in the first row.
        expected: usize,
    },
}

/// Result type for NURBS construction.
pub type Result<T> = std::result::Result<T, NurbsError>;

// =============================================================================
// Knot vector utilities
// =============================================================================

/// Validate a knot vector: length = n_control_points + degree + 1, non-decreasing,
/// non-empty domain. The count is checked first and reported exactly.
pub fn validate_knots(
    direction: &'static str,
    knots: &[f64],
    n_points: usize,
    degree: usize,
) -> Result<()> {
    if degree == 0 {
        return Err(NurbsError::ZeroDegree { direction });
    }
    let expected = n_points
        .checked_add(degree)
        .and_then(|n| n.checked_add(1))
        .ok_or(NurbsError::DegreeTooLarge { direction, degree })?;
    if knots.len() != expected {
        return Err(NurbsError::KnotCount {
            direction,
            actual: knots.len(),
            expected,
            control_points: n_points,
            degree,
        });
    }
    if n_points <= degree {
        return Err(NurbsError::TooFewControlPoints {
            direction,
            degree,
            actual: n_points,
        });
    }
    for i in 1..knots.len() {
        if knots[i] < knots[i - 1] {
            return Err(NurbsError::DecreasingKnots {
                direction,
                index: i,
            });
        }
    }
    if knots[n_points] - knots[degree] <= 0.0 {
        return Err(NurbsError::EmptyDomain { direction });
    }
    Ok(())
}

/// Find the knot span index for parameter `t`.
///
/// Returns `i` such that `knots[i] <= t < knots[i+1]`, clamped to the valid
/// range. For `t` at the end of the domain, returns the last non-empty span.
fn find_span(knots: &[f64], n: usize, degree: usize, t: f64) -> usize {
    // n = number of control points - 1 (last index)
    if t >= knots[n + 1] {
        let mut span = n;
        while span > degree && knots[span] >= knots[n + 1] {
            span -= 1;
        }
        return span;
    }
    if t <= knots[degree] {
        let mut span = degree;
        while span < n && knots[span + 1] <= t {
            span += 1;
        }
        return span;
    }
    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while t < knots[mid] || t >= knots[mid + 1] {
        if t < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Compute the `degree + 1` non-zero basis function values at `t`.
fn basis_functions(knots: &[f64], span: usize, degree: usize, t: f64) -> Vec<f64> {
    let mut n = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    n[0] = 1.0;

    for j in 1..=degree {
        left[j] = t - knots[span + 1 - j];
        right[j] = knots[span + j] - t;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            // Zero-length knot interval contributes nothing.
            let temp = if denom.abs() < 1e-30 { 0.0 } else { n[r] / denom };
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }

    n
}

// =============================================================================
// Weighted control points
// =============================================================================

/// A weighted control point (homogeneous coordinates).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedPoint {
    /// 3D position (Cartesian, not premultiplied by the weight).
    pub point: Point3,
    /// Weight (must be > 0).
    pub weight: f64,
}

impl WeightedPoint {
    /// Create a weighted point.
    pub fn new(point: Point3, weight: f64) -> Self {
        Self { point, weight }
    }

    /// Create with unit weight.
    pub fn unweighted(point: Point3) -> Self {
        Self { point, weight: 1.0 }
    }

    /// Convert to homogeneous coordinates: `(w*x, w*y, w*z, w)`.
    pub fn to_homogeneous(&self) -> [f64; 4] {
        [
            self.weight * self.point.x,
            self.weight * self.point.y,
            self.weight * self.point.z,
            self.weight,
        ]
    }
}

fn validate_weights(points: &[WeightedPoint]) -> Result<()> {
    for (index, p) in points.iter().enumerate() {
        if !(p.weight.is_finite() && p.weight > 0.0) {
            return Err(NurbsError::InvalidWeight {
                index,
                weight: p.weight,
            });
        }
    }
    Ok(())
}

fn project(h: [f64; 4]) -> Point3 {
    if h[3].abs() < 1e-30 {
        Point3::origin()
    } else {
        Point3::new(h[0] / h[3], h[1] / h[3], h[2] / h[3])
    }
}

// =============================================================================
// NURBS curve
// =============================================================================

/// A rational B-spline (NURBS) curve in 3D.
#[derive(Debug, Clone)]
pub struct NurbsCurve {
    control_points: Vec<WeightedPoint>,
    knots: Vec<f64>,
    degree: usize,
}

impl NurbsCurve {
    /// Create a NURBS curve, validating knots and weights.
    pub fn new(control_points: Vec<WeightedPoint>, knots: Vec<f64>, degree: usize) -> Result<Self> {
        validate_knots("curve", &knots, control_points.len(), degree)?;
        validate_weights(&control_points)?;
        Ok(Self {
            control_points,
            knots,
            degree,
        })
    }

    /// Polynomial degree.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Number of control points.
    pub fn num_control_points(&self) -> usize {
        self.control_points.len()
    }

    /// Parameter domain `(t_min, t_max)`.
    pub fn parameter_domain(&self) -> (f64, f64) {
        (
            self.knots[self.degree],
            self.knots[self.control_points.len()],
        )
    }

    /// Evaluate the curve at parameter `t` (clamped to the domain).
    pub fn eval(&self, t: f64) -> Point3 {
        let n = self.control_points.len() - 1;
        let (t_min, t_max) = self.parameter_domain();
        let t = t.clamp(t_min, t_max);
        let span = find_span(&self.knots, n, self.degree, t);
        let basis = basis_functions(&self.knots, span, self.degree, t);

        let mut h = [0.0; 4];
        for (i, &b) in basis.iter().enumerate() {
            let cp = self.control_points[span - self.degree + i].to_homogeneous();
            for k in 0..4 {
                h[k] += b * cp[k];
            }
        }
        project(h)
    }

    /// Number of subdivisions used to render this curve:
    /// `control points * degree * 4`.
    pub fn sample_divisions(&self) -> usize {
        self.control_points.len() * self.degree * SAMPLES_PER_SPAN
    }

    /// Renderable samples of the curve.
    ///
    /// Degree-1 curves are their own control polygon and are returned as-is.
    /// Higher degrees are sampled uniformly in parameter space with
    /// [`sample_divisions`](Self::sample_divisions) segments, so the result has
    /// one more point than there are divisions. The samples approximate the
    /// curve; they are not a precision guarantee.
    pub fn sample(&self) -> Vec<Point3> {
        if self.degree == 1 {
            return self.control_points.iter().map(|cp| cp.point).collect();
        }
        let divisions = self.sample_divisions();
        let (t_min, t_max) = self.parameter_domain();
        (0..=divisions)
            .map(|i| {
                let s = i as f64 / divisions as f64;
                self.eval(t_min + (t_max - t_min) * s)
            })
            .collect()
    }
}

/// Evaluate a curve description straight to render samples.
///
/// Fails before sampling when the knot vector or weights are malformed.
pub fn evaluate_curve(
    degree: usize,
    knots: &[f64],
    control_points: &[WeightedPoint],
) -> Result<Vec<Point3>> {
    let curve = NurbsCurve::new(control_points.to_vec(), knots.to_vec(), degree)?;
    Ok(curve.sample())
}

// =============================================================================
// NURBS surface
// =============================================================================

/// A rational tensor-product NURBS surface.
///
/// Control points are stored u-major: `points[u_idx * n_v + v_idx]`.
#[derive(Debug, Clone)]
pub struct NurbsSurface {
    control_points: Vec<WeightedPoint>,
    n_u: usize,
    n_v: usize,
    knots_u: Vec<f64>,
    knots_v: Vec<f64>,
    degree_u: usize,
    degree_v: usize,
}

impl NurbsSurface {
    /// Create a NURBS surface from a `grid[u][v]` of weighted control points.
    pub fn new(
        grid: Vec<Vec<WeightedPoint>>,
        knots_u: Vec<f64>,
        knots_v: Vec<f64>,
        degree_u: usize,
        degree_v: usize,
    ) -> Result<Self> {
        let n_u = grid.len();
        let n_v = grid.first().map_or(0, Vec::len);
        for (row, points) in grid.iter().enumerate() {
            if points.len() != n_v {
                return Err(NurbsError::RaggedGrid {
                    row,
                    actual: points.len(),
                    expected: n_v,
                });
            }
        }
        validate_knots("u", &knots_u, n_u, degree_u)?;
        validate_knots("v", &knots_v, n_v, degree_v)?;
        let control_points: Vec<WeightedPoint> = grid.into_iter().flatten().collect();
        validate_weights(&control_points)?;
        Ok(Self {
            control_points,
            n_u,
            n_v,
            knots_u,
            knots_v,
            degree_u,
            degree_v,
        })
    }

    fn cp(&self, u_idx: usize, v_idx: usize) -> &WeightedPoint {
        &self.control_points[u_idx * self.n_v + v_idx]
    }

    /// Parameter domain `((u_min, u_max), (v_min, v_max))`.
    pub fn parameter_domain(&self) -> ((f64, f64), (f64, f64)) {
        (
            (self.knots_u[self.degree_u], self.knots_u[self.n_u]),
            (self.knots_v[self.degree_v], self.knots_v[self.n_v]),
        )
    }

    /// Evaluate the surface at `(u, v)` using tensor-product De Boor.
    pub fn eval(&self, u: f64, v: f64) -> Point3 {
        let nu = self.n_u - 1;
        let nv = self.n_v - 1;
        let ((u_min, u_max), (v_min, v_max)) = self.parameter_domain();
        let u = u.clamp(u_min, u_max);
        let v = v.clamp(v_min, v_max);

        let span_u = find_span(&self.knots_u, nu, self.degree_u, u);
        let span_v = find_span(&self.knots_v, nv, self.degree_v, v);
        let basis_u = basis_functions(&self.knots_u, span_u, self.degree_u, u);
        let basis_v = basis_functions(&self.knots_v, span_v, self.degree_v, v);

        let mut h = [0.0; 4];
        for (i, &bu) in basis_u.iter().enumerate() {
            let u_idx = span_u - self.degree_u + i;
            for (j, &bv) in basis_v.iter().enumerate() {
                let v_idx = span_v - self.degree_v + j;
                let w = bu * bv;
                let cp = self.cp(u_idx, v_idx).to_homogeneous();
                for k in 0..4 {
                    h[k] += w * cp[k];
                }
            }
        }
        project(h)
    }

    /// Evaluate with `(s, t)` in the unit square mapped onto the domain.
    pub fn eval_normalized(&self, s: f64, t: f64) -> Point3 {
        let ((u_min, u_max), (v_min, v_max)) = self.parameter_domain();
        self.eval(u_min + (u_max - u_min) * s, v_min + (v_max - v_min) * t)
    }

    /// Subdivisions per direction used when tessellating:
    /// `(degree_u * n_u * 4, degree_v * n_v * 4)`.
    pub fn subdivisions(&self) -> (usize, usize) {
        (
            self.degree_u * self.n_u * SAMPLES_PER_SPAN,
            self.degree_v * self.n_v * SAMPLES_PER_SPAN,
        )
    }
}

/// Build a surface and hand back its parametric function over the unit square.
///
/// Fails before any evaluation when either knot vector is malformed.
pub fn evaluate_surface(
    degree_u: usize,
    degree_v: usize,
    knots_u: &[f64],
    knots_v: &[f64],
    grid: Vec<Vec<WeightedPoint>>,
) -> Result<impl Fn(f64, f64) -> Point3> {
    let surface = NurbsSurface::new(grid, knots_u.to_vec(), knots_v.to_vec(), degree_u, degree_v)?;
    Ok(move |s, t| surface.eval_normalized(s, t))
}
