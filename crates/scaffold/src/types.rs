//! Core scaffold types.
//!
//! Gaussian primitives are the read-only input of a generation pass; the
//! scaffold mesh is its only output. Everything in between lives in the
//! octree arena and is discarded when the pass ends.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Smallest per-axis scale used when inverting a primitive's covariance.
pub const MIN_SCALE: f32 = 1e-6;

/// Primitive bounding boxes cover this many standard deviations per axis.
pub const BOUNDS_SIGMA: f32 = 3.0;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min/max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from its center and per-axis half extent.
    pub fn from_center_half_extent(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Create an AABB that contains nothing (for accumulation).
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    /// Bounds enclosing every primitive's bounding box, padded on each side
    /// by `padding` times the largest extent.
    ///
    /// Returns an empty AABB for an empty slice.
    pub fn from_primitives(primitives: &[GaussianPrimitive], padding: f32) -> Self {
        let mut bounds = Self::empty();
        for primitive in primitives {
            bounds.include_aabb(&primitive.bounds);
        }
        if primitives.is_empty() {
            return bounds;
        }
        let pad = Vec3::splat(bounds.size().max_element() * padding);
        bounds.min -= pad;
        bounds.max += pad;
        bounds
    }

    /// Expand this AABB to include a point.
    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Expand this AABB to include another box.
    pub fn include_aabb(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn half_extent(&self) -> Vec3 {
        self.size() * 0.5
    }

    pub fn volume(&self) -> f32 {
        let size = self.size();
        size.x * size.y * size.z
    }

    /// True when the box has zero, negative or non-finite volume.
    pub fn is_degenerate(&self) -> bool {
        let size = self.size();
        !size.is_finite() || size.min_element() <= 0.0
    }

    /// Closed containment test (points on the boundary are inside).
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Closed overlap test (boxes sharing only a face still intersect).
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Grow the box by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }
}

/// An anisotropic 3D Gaussian with opacity ("splat").
///
/// Immutable input to a generation pass. `bounds` is derived from the other
/// fields at construction and kept alongside so candidate filtering never
/// recomputes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianPrimitive {
    pub center: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub opacity: f32,
    pub bounds: Aabb,
}

impl GaussianPrimitive {
    /// Create a primitive, normalizing the rotation and deriving its bounds.
    pub fn new(center: Vec3, rotation: Quat, scale: Vec3, opacity: f32) -> Self {
        let length = rotation.length();
        let rotation = if length > 1e-8 && length.is_finite() {
            rotation / length
        } else {
            Quat::IDENTITY
        };
        let scale = scale.abs();
        Self {
            center,
            rotation,
            scale,
            opacity,
            bounds: Self::oriented_bounds(center, rotation, scale),
        }
    }

    /// Axis-aligned primitive with the same standard deviation on every axis.
    pub fn isotropic(center: Vec3, sigma: f32, opacity: f32) -> Self {
        Self::new(center, Quat::IDENTITY, Vec3::splat(sigma), opacity)
    }

    /// Copy of this primitive with every scale axis multiplied by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.center, self.rotation, self.scale * factor, self.opacity)
    }

    /// Scale with each axis clamped away from zero, safe to divide by.
    pub fn safe_scale(&self) -> Vec3 {
        self.scale.max(Vec3::splat(MIN_SCALE))
    }

    /// Map a world point into the primitive's unit-variance frame.
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        (self.rotation.inverse() * (point - self.center)) / self.safe_scale()
    }

    /// World AABB of the `BOUNDS_SIGMA` ellipsoid.
    fn oriented_bounds(center: Vec3, rotation: Quat, scale: Vec3) -> Aabb {
        let axes = Mat3::from_quat(rotation);
        let sigma = scale * BOUNDS_SIGMA;
        let half_extent = Vec3::new(
            axes.row(0).abs().dot(sigma),
            axes.row(1).abs().dot(sigma),
            axes.row(2).abs().dot(sigma),
        );
        Aabb::from_center_half_extent(center, half_extent)
    }
}

/// Octree subdivision limits.
///
/// Values are configurable and should not be treated as magic numbers.
#[derive(Debug, Clone)]
pub struct OctreeConfig {
    /// A node needs at least this many candidate primitives to split (default: 10)
    pub min_primitives: usize,
    /// Minimum candidate opacity sum for a node to split.
    /// `None` uses the iso threshold: below it the field cannot reach the surface.
    pub opacity_threshold: Option<f32>,
    /// Hard limit on arena size; exceeding it aborts the pass (default: 2,000,000)
    pub max_nodes: usize,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            min_primitives: 10,
            opacity_threshold: None,
            max_nodes: 2_000_000,
        }
    }
}

/// Triangle scaffold produced by a generation pass.
///
/// `indices` is a flat triangle list; its length is always a multiple of 3.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaffoldMesh {
    pub vertices: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl ScaffoldMesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate triangles as vertex position triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).map(|tri| {
            [
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            ]
        })
    }

    /// Raw vertex data for GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Raw index data for GPU upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
