//! Breadth-first octree construction.
//!
//! The tree grows one layer at a time. Each split hands the parent's
//! candidate list down to its children, filtered against the child bounds,
//! so the global primitive list is only scanned once, at the root.

use glam::Vec3;
use tracing::{debug, trace, warn};

use super::{MAX_TREE_DEPTH, NodeId, Octree};
use crate::budget::NodeBudget;
use crate::density::DensityField;
use crate::error::ScaffoldError;
use crate::types::{Aabb, OctreeConfig};

impl Octree {
    /// Build the adaptive octree for `field` within `bounds`.
    ///
    /// Empty input or degenerate bounds yield a single non-surface root leaf.
    /// Fails with [`ScaffoldError::InvalidSettings`] when `max_depth` exceeds
    /// [`MAX_TREE_DEPTH`], and with [`ScaffoldError::NodeBudgetExceeded`] when
    /// the arena would outgrow `config.max_nodes`.
    pub fn build(
        field: &DensityField<'_>,
        bounds: Aabb,
        max_depth: u32,
        config: &OctreeConfig,
    ) -> Result<Self, ScaffoldError> {
        if max_depth > MAX_TREE_DEPTH {
            return Err(ScaffoldError::InvalidSettings(format!(
                "octree depth {max_depth} exceeds the supported maximum of {MAX_TREE_DEPTH}"
            )));
        }
        let mut budget = NodeBudget::new(config.max_nodes);
        budget.reserve(1)?;
        let mut tree = Self::with_root(bounds, max_depth);

        if field.primitives().is_empty() {
            debug!("octree build: no primitives, returning empty root");
            return Ok(tree);
        }
        if bounds.is_degenerate() {
            warn!(?bounds, "octree build: degenerate root bounds, returning empty root");
            return Ok(tree);
        }

        let opacity_threshold = config.opacity_threshold.unwrap_or(field.threshold());
        let root = tree.root();
        let root_candidates: Vec<u32> = field
            .primitives()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.bounds.intersects(&bounds))
            .map(|(i, _)| i as u32)
            .collect();
        let root_potential = is_potential_surface(
            field,
            tree.node(root).center,
            &bounds,
            &root_candidates,
            opacity_threshold,
        );
        {
            let node = tree.node_mut(root);
            node.candidates = root_candidates;
            node.contains_potential_surface = root_potential;
        }

        let mut layer = vec![root];
        for depth in 0..max_depth {
            let mut next_layer = Vec::new();
            for id in layer {
                if !tree.should_split(id, field, config.min_primitives, opacity_threshold) {
                    continue;
                }
                budget.reserve(8)?;
                next_layer.extend(tree.split_with_candidates(id, field, opacity_threshold));
            }
            trace!(depth = depth + 1, nodes = next_layer.len(), "octree layer built");
            if next_layer.is_empty() {
                break;
            }
            layer = next_layer;
        }

        debug!(
            nodes = tree.len(),
            leaves = tree.leaf_count(),
            "octree build complete"
        );
        Ok(tree)
    }

    /// Split test, evaluated once per node when its layer is processed.
    fn should_split(
        &self,
        id: NodeId,
        field: &DensityField<'_>,
        min_primitives: usize,
        opacity_threshold: f32,
    ) -> bool {
        let node = self.node(id);
        node.contains_potential_surface
            && node.candidates.len() >= min_primitives
            && field.opacity_sum(&node.candidates) >= opacity_threshold
    }

    /// Subdivide `id` and partition its candidates among the children.
    fn split_with_candidates(
        &mut self,
        id: NodeId,
        field: &DensityField<'_>,
        opacity_threshold: f32,
    ) -> [NodeId; 8] {
        let parent_candidates = std::mem::take(&mut self.node_mut(id).candidates);
        let children = self.subdivide(id);

        for &child in &children {
            let (center, child_bounds) = {
                let node = self.node(child);
                (node.center, node.bounds())
            };
            let candidates: Vec<u32> = parent_candidates
                .iter()
                .copied()
                .filter(|&i| field.primitive(i).bounds.intersects(&child_bounds))
                .collect();
            let potential =
                is_potential_surface(field, center, &child_bounds, &candidates, opacity_threshold);

            let node = self.node_mut(child);
            node.candidates = candidates;
            node.contains_potential_surface = potential;
        }
        children
    }
}

/// Whether the iso-surface may pass through a node.
///
/// The candidate opacity sum bounds the density from above, so nodes below
/// the opacity threshold are rejected outright. Otherwise the field is
/// sampled at the corners, the center and every candidate center inside the
/// node; a sign change among those samples marks the node.
fn is_potential_surface(
    field: &DensityField<'_>,
    center: Vec3,
    bounds: &Aabb,
    candidates: &[u32],
    opacity_threshold: f32,
) -> bool {
    if candidates.is_empty() || field.opacity_sum(candidates) < opacity_threshold {
        return false;
    }

    let inside = |point: Vec3| field.evaluate(point, candidates) >= 0.0;
    let reference = inside(center);

    let half_extent = bounds.half_extent();
    let corners = (0..8).map(|i| center + super::octant_signs(i) * half_extent);
    let splat_centers = candidates
        .iter()
        .map(|&i| field.primitive(i).center)
        .filter(|c| bounds.contains_point(*c));

    corners.chain(splat_centers).any(|p| inside(p) != reference)
}
