//! Obstacle geometry and the collision queries the voxelizer needs.
//!
//! Shapes live in their own local frame. The voxelizer maps each lattice cell
//! into that frame (see [`crate::obstacle::Obstacle::cell_to_local`]) and asks
//! the shape three questions: does it touch the box, does it swallow the box,
//! and how much of the box does it cover.
//!
//! Built-in shapes:
//! - [`Cuboid`]: axis-aligned box centred at the origin, exact answers
//! - [`Sphere`]: ball centred at the origin
//! - [`TriMesh`]: closed triangle mesh, validated on construction

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::OVERLAP_SAMPLES;
use crate::error::{FluidError, Result};

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box spanning two arbitrary corners.
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The lattice cell `[x, x+1] × [y, y+1] × [z, z+1]`.
    pub fn unit_cell(x: usize, y: usize, z: usize) -> Self {
        let min = Vec3::new(x as f32, y as f32, z as f32);
        Self { min, max: min + Vec3::ONE }
    }

    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        let s = self.size().max(Vec3::ZERO);
        s.x * s.y * s.z
    }

    /// Check if point is inside (inclusive).
    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// True if `other` lies entirely inside `self` (inclusive).
    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        other.min.cmpge(self.min).all() && other.max.cmple(self.max).all()
    }

    /// True if the boxes share interior volume. Touching faces do not count.
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmplt(other.max).all() && self.max.cmpgt(other.min).all()
    }

    pub fn intersection(&self, other: &Aabb) -> Option<Aabb> {
        if !self.intersects(other) {
            return None;
        }
        Some(Aabb {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        })
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}

/// Collision oracle for one obstacle shape, in the shape's local frame.
pub trait CollisionShape: Send + Sync + std::fmt::Debug {
    /// Bounds of the shape in its local frame.
    fn local_aabb(&self) -> Aabb;

    fn contains_point(&self, p: Vec3) -> bool;

    /// True if the shape and the box share volume.
    fn intersects_aabb(&self, b: &Aabb) -> bool;

    /// True if the box is fully covered by the shape.
    ///
    /// Defaults to containment in the shape's bounding box. Shapes whose
    /// bounds are loose should override this.
    fn contains_aabb(&self, b: &Aabb) -> bool {
        self.local_aabb().contains(b)
    }

    /// Volume of `b` covered by the shape, in local units.
    ///
    /// Defaults to sampling `OVERLAP_SAMPLES³` points on a regular grid.
    fn overlap_volume(&self, b: &Aabb) -> f32 {
        sampled_overlap(self, b)
    }
}

/// Point-sampled estimate of how much of `b` lies inside `shape`.
pub fn sampled_overlap<S: CollisionShape + ?Sized>(shape: &S, b: &Aabb) -> f32 {
    let samples = OVERLAP_SAMPLES;
    let step = b.size() / samples as f32;
    let mut inside = 0usize;

    for k in 0..samples {
        for j in 0..samples {
            for i in 0..samples {
                let offset = Vec3::new(i as f32 + 0.5, j as f32 + 0.5, k as f32 + 0.5) * step;
                if shape.contains_point(b.min + offset) {
                    inside += 1;
                }
            }
        }
    }

    b.volume() * inside as f32 / (samples * samples * samples) as f32
}

// =============================================================================
// Cuboid
// =============================================================================

/// Box centred at the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    #[serde(with = "crate::serde_utils::vec3")]
    pub half_extents: Vec3,
}

impl Cuboid {
    pub fn new(half_extents: Vec3) -> Self {
        Self {
            half_extents: half_extents.abs(),
        }
    }

    /// Unit cube spanning `[-0.5, 0.5]³`.
    pub fn unit() -> Self {
        Self::new(Vec3::splat(0.5))
    }
}

impl CollisionShape for Cuboid {
    fn local_aabb(&self) -> Aabb {
        Aabb::new(-self.half_extents, self.half_extents)
    }

    fn contains_point(&self, p: Vec3) -> bool {
        p.abs().cmple(self.half_extents).all()
    }

    fn intersects_aabb(&self, b: &Aabb) -> bool {
        self.local_aabb().intersects(b)
    }

    fn overlap_volume(&self, b: &Aabb) -> f32 {
        self.local_aabb()
            .intersection(b)
            .map_or(0.0, |overlap| overlap.volume())
    }
}

// =============================================================================
// Sphere
// =============================================================================

/// Ball centred at the origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub radius: f32,
}

impl Sphere {
    pub fn new(radius: f32) -> Self {
        Self {
            radius: radius.abs(),
        }
    }
}

impl CollisionShape for Sphere {
    fn local_aabb(&self) -> Aabb {
        Aabb::new(Vec3::splat(-self.radius), Vec3::splat(self.radius))
    }

    fn contains_point(&self, p: Vec3) -> bool {
        p.length_squared() <= self.radius * self.radius
    }

    fn intersects_aabb(&self, b: &Aabb) -> bool {
        let closest = Vec3::ZERO.clamp(b.min, b.max);
        closest.length_squared() < self.radius * self.radius
    }

    // A convex shape holds the box iff it holds every corner.
    fn contains_aabb(&self, b: &Aabb) -> bool {
        b.corners().iter().all(|&c| self.contains_point(c))
    }
}

// =============================================================================
// Triangle mesh
// =============================================================================

/// Closed triangle mesh. Inside/outside is decided by the generalized winding
/// number, so the mesh should be watertight with consistent winding.
#[derive(Clone, Debug)]
pub struct TriMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    bounds: Aabb,
}

impl TriMesh {
    /// Build a mesh, rejecting missing or inconsistent geometry.
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        if vertices.is_empty() {
            return Err(FluidError::MissingVertices);
        }
        if triangles.is_empty() {
            return Err(FluidError::MissingTriangles);
        }
        if let Some(i) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(FluidError::NonFiniteVertex(i));
        }
        for (t, tri) in triangles.iter().enumerate() {
            if let Some(&index) = tri.iter().find(|&&i| i as usize >= vertices.len()) {
                return Err(FluidError::TriangleIndexOutOfRange {
                    triangle: t,
                    index,
                    vertex_count: vertices.len(),
                });
            }
        }

        let mut min = vertices[0];
        let mut max = vertices[0];
        for &v in &vertices[1..] {
            min = min.min(v);
            max = max.max(v);
        }

        Ok(Self {
            vertices,
            triangles,
            bounds: Aabb::new(min, max),
        })
    }

    /// Closed box mesh (12 triangles) spanning `min..max`. Handy for tests
    /// and as a stand-in for imported geometry.
    pub fn cuboid(min: Vec3, max: Vec3) -> Result<Self> {
        let b = Aabb::from_corners(min, max);
        let vertices = b.corners().to_vec();
        // Corner order matches Aabb::corners: bit 0 = x, bit 1 = y, bit 2 = z
        #[rustfmt::skip]
        let triangles = vec![
            [0, 2, 1], [1, 2, 3], // -z
            [4, 5, 6], [5, 7, 6], // +z
            [0, 1, 4], [1, 5, 4], // -y
            [2, 6, 3], [3, 6, 7], // +y
            [0, 4, 2], [2, 4, 6], // -x
            [1, 3, 5], [3, 7, 5], // +x
        ];
        Self::new(vertices, triangles)
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    #[inline]
    fn triangle(&self, tri: &[u32; 3]) -> [Vec3; 3] {
        [
            self.vertices[tri[0] as usize],
            self.vertices[tri[1] as usize],
            self.vertices[tri[2] as usize],
        ]
    }

    /// Generalized winding number of the mesh around `p`: about ±1 inside a
    /// closed mesh, about 0 outside. Shared edges and vertices need no
    /// special casing.
    pub fn winding_number(&self, p: Vec3) -> f32 {
        let total: f32 = self
            .triangles
            .iter()
            .map(|tri| {
                let [a, b, c] = self.triangle(tri);
                solid_angle([a - p, b - p, c - p])
            })
            .sum();
        total / (4.0 * std::f32::consts::PI)
    }

    fn any_triangle_touches(&self, b: &Aabb) -> bool {
        self.triangles
            .iter()
            .any(|tri| triangle_intersects_aabb(self.triangle(tri), b))
    }
}

impl CollisionShape for TriMesh {
    fn local_aabb(&self) -> Aabb {
        self.bounds
    }

    fn contains_point(&self, p: Vec3) -> bool {
        if !self.bounds.contains_point(p) {
            return false;
        }
        self.winding_number(p).abs() > 0.5
    }

    fn intersects_aabb(&self, b: &Aabb) -> bool {
        if !self.bounds.intersects(b) {
            return false;
        }
        // Surface crosses the box, or the box sits wholly inside the mesh.
        self.any_triangle_touches(b) || self.contains_point(b.center())
    }

    fn contains_aabb(&self, b: &Aabb) -> bool {
        self.bounds.contains(b) && !self.any_triangle_touches(b) && self.contains_point(b.center())
    }
}

/// Signed solid angle subtended at the origin by the triangle `a, b, c`
/// (Van Oosterom–Strackee).
fn solid_angle([a, b, c]: [Vec3; 3]) -> f32 {
    let (la, lb, lc) = (a.length(), b.length(), c.length());
    let numerator = a.dot(b.cross(c));
    let denominator = la * lb * lc + a.dot(b) * lc + a.dot(c) * lb + b.dot(c) * la;
    2.0 * numerator.atan2(denominator)
}

/// Separating-axis test between a triangle and a box.
///
/// Candidate axes: the three box normals, the triangle normal, and the nine
/// cross products of triangle edges with box normals.
fn triangle_intersects_aabb(tri: [Vec3; 3], b: &Aabb) -> bool {
    let centre = b.center();
    let h = b.half_extents();
    let v = [tri[0] - centre, tri[1] - centre, tri[2] - centre];
    let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];

    let separated = |axis: Vec3| -> bool {
        if axis.length_squared() < 1e-12 {
            return false;
        }
        let p0 = v[0].dot(axis);
        let p1 = v[1].dot(axis);
        let p2 = v[2].dot(axis);
        let r = h.x * axis.x.abs() + h.y * axis.y.abs() + h.z * axis.z.abs();
        p0.min(p1).min(p2) > r || p0.max(p1).max(p2) < -r
    };

    for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
        if separated(axis) {
            return false;
        }
    }

    if separated(edges[0].cross(edges[1])) {
        return false;
    }

    for edge in edges {
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            if separated(edge.cross(axis)) {
                return false;
            }
        }
    }

    true
}
