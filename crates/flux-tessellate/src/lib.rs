#![warn(missing_docs)]

//! Tessellation of Flux primitives into renderable vertex buffers.
//!
//! Two geometry representations live here:
//!
//! - [`FaceMesh`]: editable vertex list plus triangle faces. Produced by the
//!   polygon triangulator, the parametric surface tessellator and the mesh
//!   primitive.
//! - [`BufferGeometry`]: flat `f32` position/normal arrays plus `u32`
//!   indices, ready for GPU upload. Produced directly by the solid
//!   generators and by [`FaceMesh::to_buffer`].
//!
//! Alongside them sit the numeric solvers the builders need: three-point
//! arc reconstruction ([`arc`]), planar polygon triangulation ([`polygon`]),
//! parametric surface sampling ([`parametric`]) and the closed solids
//! ([`solids`]).

pub mod arc;
pub mod parametric;
pub mod polygon;
pub mod solids;

use flux_math::{Point3, Transform, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use arc::{arc_points, circle_points, ellipse_points, ARC_SEGMENTS_PER_CIRCLE};
pub use parametric::tessellate_parametric;
pub use polygon::{triangulate_polygon, triangulate_polygon_set, Polygon, PLANARITY_TOLERANCE};
pub use solids::{box_mesh, cylinder_mesh, sphere_mesh, torus_mesh};

/// Errors raised by the tessellators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TessellateError {
    /// A polygon point lies off the plane of its boundary.
    #[error("Non planar polygon: point {index} lies {distance:.3e} off the boundary plane")]
    NonPlanar {
        /// Index of the point (boundary first, then holes in order).
        index: usize,
        /// Distance from the plane.
        distance: f64,
    },

    /// Polygon has fewer than three usable boundary points or zero area.
    #[error("degenerate polygon: {0}")]
    DegeneratePolygon(String),

    /// Arc tessellation produced nothing.
    #[error("Arc has no vertices")]
    ArcNoVertices,
}

/// Result type for tessellation.
pub type Result<T> = std::result::Result<T, TessellateError>;

/// Axis-aligned bounds `(min, max)`.
pub type Bounds = (Point3, Point3);

fn extend_bounds(bounds: &mut Option<Bounds>, p: &Point3) {
    match bounds {
        None => *bounds = Some((*p, *p)),
        Some((min, max)) => {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
    }
}

/// Flat, GPU-ready geometry buffers.
///
/// Index interpretation depends on the node that owns the buffer: triangles
/// for meshes, segment pairs for lines, unused for point clouds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferGeometry {
    /// Flat array of vertex positions: `[x0, y0, z0, x1, y1, z1, ...]` (f32).
    pub vertices: Vec<f32>,
    /// Flat array of indices (u32).
    pub indices: Vec<u32>,
    /// Flat array of vertex normals. Either empty or the same length as `vertices`.
    pub normals: Vec<f32>,
}

impl BufferGeometry {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer holding `points` with no indices.
    pub fn from_points(points: &[Point3]) -> Self {
        let mut geometry = Self::new();
        for p in points {
            geometry.push_vertex(p);
        }
        geometry
    }

    /// Buffer holding `points` as a connected line strip, indexed as segment pairs.
    pub fn line_strip(points: &[Point3]) -> Self {
        let mut geometry = Self::from_points(points);
        for i in 1..points.len() {
            geometry.indices.push((i - 1) as u32);
            geometry.indices.push(i as u32);
        }
        geometry
    }

    /// Append a vertex position.
    pub fn push_vertex(&mut self, p: &Point3) {
        self.vertices.push(p.x as f32);
        self.vertices.push(p.y as f32);
        self.vertices.push(p.z as f32);
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Number of triangles when indices are read as triangles.
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of segments when indices are read as segment pairs.
    pub fn num_segments(&self) -> usize {
        self.indices.len() / 2
    }

    /// Vertex positions as points.
    pub fn positions(&self) -> impl Iterator<Item = Point3> + '_ {
        self.vertices
            .chunks_exact(3)
            .map(|c| Point3::new(c[0] as f64, c[1] as f64, c[2] as f64))
    }

    /// Merge another buffer into this one.
    ///
    /// Normals survive only when both sides carry them.
    pub fn merge(&mut self, other: &BufferGeometry) {
        let keep_normals = !self.normals.is_empty() && !other.normals.is_empty();
        let offset = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        if keep_normals {
            self.normals.extend_from_slice(&other.normals);
        } else {
            self.normals.clear();
        }
        self.indices.extend(other.indices.iter().map(|&i| i + offset));
    }

    /// Copy of this buffer with `transform` applied to positions and normals.
    pub fn transformed(&self, transform: &Transform) -> Self {
        let mut out = Self {
            vertices: Vec::with_capacity(self.vertices.len()),
            indices: self.indices.clone(),
            normals: Vec::with_capacity(self.normals.len()),
        };
        for p in self.positions() {
            out.push_vertex(&transform.apply_point(&p));
        }
        for n in self.normals.chunks_exact(3) {
            let v = transform.apply_normal(&Vec3::new(n[0] as f64, n[1] as f64, n[2] as f64));
            let v = if v.norm() > 1e-12 { v.normalize() } else { v };
            out.normals.extend_from_slice(&[v.x as f32, v.y as f32, v.z as f32]);
        }
        out
    }

    /// Axis-aligned bounds of all positions.
    pub fn bounding_box(&self) -> Option<Bounds> {
        let mut bounds = None;
        for p in self.positions() {
            extend_bounds(&mut bounds, &p);
        }
        bounds
    }
}

/// Editable mesh: explicit vertex list and triangle faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangles as vertex index triples.
    pub faces: Vec<[u32; 3]>,
}

impl FaceMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.faces.len()
    }

    /// Merge another mesh into this one.
    pub fn merge(&mut self, other: &FaceMesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]),
        );
    }

    /// Copy of this mesh with `transform` applied to every vertex.
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self {
            vertices: flux_math::bake_transform(&self.vertices, transform),
            faces: self.faces.clone(),
        }
    }

    /// Total triangle area.
    pub fn area(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let a = self.vertices[f[0] as usize];
                let b = self.vertices[f[1] as usize];
                let c = self.vertices[f[2] as usize];
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    /// Axis-aligned bounds of all vertices.
    pub fn bounding_box(&self) -> Option<Bounds> {
        let mut bounds = None;
        for p in &self.vertices {
            extend_bounds(&mut bounds, p);
        }
        bounds
    }

    /// Convert to flat buffers with area-weighted vertex normals.
    pub fn to_buffer(&self) -> BufferGeometry {
        let mut accum = vec![Vec3::zeros(); self.vertices.len()];
        for f in &self.faces {
            let a = self.vertices[f[0] as usize];
            let b = self.vertices[f[1] as usize];
            let c = self.vertices[f[2] as usize];
            let n = (b - a).cross(&(c - a));
            for &i in f {
                accum[i as usize] += n;
            }
        }

        let mut buffer = BufferGeometry::new();
        for (p, n) in self.vertices.iter().zip(&accum) {
            buffer.push_vertex(p);
            let n = if n.norm() > 1e-12 { n.normalize() } else { Vec3::z() };
            buffer.normals.extend_from_slice(&[n.x as f32, n.y as f32, n.z as f32]);
        }
        buffer.indices = self.faces.iter().flatten().copied().collect();
        buffer
    }
}

/// Tessellation parameters controlling mesh quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct TessellationParams {
    /// Number of segments for circular features.
    pub circle_segments: u32,
    /// Number of segments along the height of cylindrical/conical features.
    pub height_segments: u32,
    /// Number of latitude bands for spherical features.
    pub latitude_segments: u32,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            circle_segments: 32,
            height_segments: 1,
            latitude_segments: 16,
        }
    }
}
