#![warn(missing_docs)]

//! Math types for the Flux scene pipeline.
//!
//! Thin wrappers around nalgebra providing the types every other crate in the
//! workspace speaks: points, vectors, directions, affine transforms, tolerance
//! constants, and the [`VectorPool`] scratch arena used by the hot numeric
//! paths (arc reconstruction, polygon basis computation).

mod pool;

pub use pool::{PoolVec, VectorPool};

use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit (normalized) direction vector in 3D space.
pub type Dir3 = Unit<Vector3<f64>>;

/// A point in 2D parameter space.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = Vector2<f64>;

/// The up axis of the target (z-up) coordinate convention.
pub fn z_up() -> Vec3 {
    Vec3::z()
}

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Rotation about the X axis by `angle` radians.
    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(1, 1)] = c;
        m[(1, 2)] = -s;
        m[(2, 1)] = s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Rotation that turns the local +Z axis toward `direction`, keeping the
    /// local +Y axis as close to `up` as possible.
    ///
    /// Mirrors the object look-at convention of real-time engines: when
    /// `direction` is parallel to `up` the target is nudged by `1e-4` on a
    /// perpendicular axis so a frame can still be formed. Returns `None` for a
    /// zero-length `direction`.
    pub fn look_at(direction: &Vec3, up: &Vec3) -> Option<Self> {
        if direction.norm_squared() < f64::EPSILON || !direction.iter().all(|c| c.is_finite()) {
            return None;
        }
        let mut z = direction.normalize();
        let mut x = up.cross(&z);
        if x.norm_squared() < f64::EPSILON {
            if (up.z.abs() - 1.0).abs() < f64::EPSILON {
                z.x += 1e-4;
            } else {
                z.z += 1e-4;
            }
            z = z.normalize();
            x = up.cross(&z);
        }
        let x = x.normalize();
        let y = z.cross(&x);

        let mut m = Matrix4::identity();
        for row in 0..3 {
            m[(row, 0)] = x[row];
            m[(row, 1)] = y[row];
            m[(row, 2)] = z[row];
        }
        Some(Self { matrix: m })
    }

    /// Compose: `self` then `other` (self * other).
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }

    /// Transform a direction vector (ignores translation, applies rotation/scale).
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let r = self.matrix * Vector4::new(v.x, v.y, v.z, 0.0);
        Vec3::new(r.x, r.y, r.z)
    }

    /// Transform a normal vector (uses inverse transpose of upper-left 3x3).
    pub fn apply_normal(&self, n: &Vec3) -> Vec3 {
        let m3 = self.matrix.fixed_view::<3, 3>(0, 0);
        if let Some(inv) = m3.try_inverse() {
            inv.transpose() * n
        } else {
            *n
        }
    }

    /// Translation component of the matrix.
    pub fn translation_part(&self) -> Vec3 {
        Vec3::new(
            self.matrix[(0, 3)],
            self.matrix[(1, 3)],
            self.matrix[(2, 3)],
        )
    }

    /// True when this transform is the identity within `1e-12`.
    pub fn is_identity(&self) -> bool {
        (self.matrix - Matrix4::identity()).amax() < 1e-12
    }

    /// Inverse of this transform, if it exists.
    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Permanently apply `transform` to a vertex list, returning the new vertices.
///
/// Used where a builder composes a placement and wants the result to live in
/// the geometry itself rather than in a pending node transform.
pub fn bake_transform(vertices: &[Point3], transform: &Transform) -> Vec<Point3> {
    vertices.iter().map(|p| transform.apply_point(p)).collect()
}

/// Euler rotation order recorded on scene nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EulerOrder {
    /// X, then Y, then Z.
    #[default]
    Xyz,
    /// Y, then X, then Z. The order used by Flux (y-up source, z-up target).
    Yxz,
}

/// Tolerance constants for geometric comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance.
    pub linear: f64,
}

impl Tolerance {
    /// Default tolerance (1e-6 linear).
    pub const DEFAULT: Self = Self { linear: 1e-6 };

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }
}

/// Build a point from a `[x, y, z]` triple.
pub fn point_from_array(a: [f64; 3]) -> Point3 {
    Point3::new(a[0], a[1], a[2])
}

/// Build a vector from a `[x, y, z]` triple.
pub fn vec_from_array(a: [f64; 3]) -> Vec3 {
    Vec3::new(a[0], a[1], a[2])
}
