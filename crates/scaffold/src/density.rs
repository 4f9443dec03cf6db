//! Scalar density field over a set of Gaussian primitives.
//!
//! The field is positive inside the iso-surface and negative outside:
//! accumulated density minus the threshold where the primitives contribute
//! measurably, and a negated distance to the nearest candidate center where
//! they do not. The fallback keeps the sign meaningful far from every splat
//! so edge scans never see a flat zero region.

use glam::Vec3;

use crate::types::GaussianPrimitive;

/// Accumulated density at or below this is treated as "no contribution".
pub const DENSITY_EPSILON: f32 = 1e-6;

/// Field value for a point with no candidate primitives at all.
pub const EMPTY_FIELD_VALUE: f32 = -1.0e9;

/// Unnormalized Gaussian weight of `primitive` at `point`, scaled by opacity.
pub fn gaussian_contribution(primitive: &GaussianPrimitive, point: Vec3) -> f32 {
    let local = primitive.to_local(point);
    primitive.opacity * (-0.5 * local.length_squared()).exp()
}

/// Read-only view of the primitives plus the iso threshold.
///
/// Candidate sets are passed per query as indices into `primitives`, so one
/// field instance is shared by every octree node.
#[derive(Debug, Clone, Copy)]
pub struct DensityField<'a> {
    primitives: &'a [GaussianPrimitive],
    threshold: f32,
}

impl<'a> DensityField<'a> {
    pub fn new(primitives: &'a [GaussianPrimitive], threshold: f32) -> Self {
        Self {
            primitives,
            threshold,
        }
    }

    pub fn primitives(&self) -> &'a [GaussianPrimitive] {
        self.primitives
    }

    pub fn primitive(&self, index: u32) -> &'a GaussianPrimitive {
        &self.primitives[index as usize]
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Raw accumulated density of the candidates at `point`.
    pub fn density(&self, point: Vec3, candidates: &[u32]) -> f32 {
        candidates
            .iter()
            .map(|&i| gaussian_contribution(self.primitive(i), point))
            .sum()
    }

    /// Signed field value at `point` for the given candidate set.
    pub fn evaluate(&self, point: Vec3, candidates: &[u32]) -> f32 {
        if candidates.is_empty() {
            return EMPTY_FIELD_VALUE;
        }

        let density = self.density(point, candidates);
        if density > DENSITY_EPSILON {
            return density - self.threshold;
        }

        let nearest = candidates
            .iter()
            .map(|&i| self.primitive(i).center.distance(point))
            .fold(f32::INFINITY, f32::min);
        -nearest
    }

    /// Sum of candidate opacities; an upper bound on density anywhere.
    pub fn opacity_sum(&self, candidates: &[u32]) -> f32 {
        candidates.iter().map(|&i| self.primitive(i).opacity).sum()
    }
}
