//! Generation pass orchestration.
//!
//! One pass runs the stages strictly in order:
//! 1. Settings → validation and primitive scaling
//! 2. Primitives → adaptive octree
//! 3. Octree → flood-fill surface classification
//! 4. Surface leaves → edge map and dual vertices
//! 5. Edge map → triangle scaffold
//!
//! Each pass builds a fresh octree and drops it at the end, so repeated
//! calls with the same input produce bit-identical meshes.

use std::borrow::Cow;

use scaffold_config::ScaffoldSettings;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classify::{ClassificationStats, classify_surface};
use crate::density::DensityField;
use crate::edge_roots::{RootSolveStats, solve_edge_roots};
use crate::error::ScaffoldError;
use crate::mesher::{MeshingStats, triangulate_edges};
use crate::octree::Octree;
use crate::types::{Aabb, GaussianPrimitive, OctreeConfig, ScaffoldMesh};

/// Surface extraction strategy.
///
/// Only the octree surface-nets path is implemented; other strategies slot in
/// as further variants behind the same [`MeshingStrategy::generate`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshingStrategy {
    /// Adaptive octree, flood-fill classification and one dual vertex per
    /// surface leaf.
    #[default]
    OctreeSurfaceNets,
}

impl MeshingStrategy {
    /// Run one generation pass with this strategy and default octree limits.
    pub fn generate(
        self,
        primitives: &[GaussianPrimitive],
        bounds: Aabb,
        settings: &ScaffoldSettings,
    ) -> Result<ScaffoldMesh, ScaffoldError> {
        match self {
            MeshingStrategy::OctreeSurfaceNets => generate(primitives, bounds, settings),
        }
    }
}

/// Counts from every stage of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationStats {
    /// Total octree nodes, internal and leaf.
    pub nodes: usize,
    pub leaves: usize,
    /// Leaves flagged potential surface during the build.
    pub potential_leaves: usize,
    /// Distinct physical edges recorded in the edge map.
    pub edges: usize,
    pub classification: ClassificationStats,
    pub roots: RootSolveStats,
    pub meshing: MeshingStats,
}

/// Generate a scaffold mesh with the default [`OctreeConfig`].
///
/// Empty input or degenerate bounds give an empty mesh rather than an error.
///
/// A node only splits while it holds at least
/// [`OctreeConfig::min_primitives`] candidates (10 by default), so sparse
/// scenes such as a single splat never subdivide and produce no triangles.
/// Use [`generate_with_stats`] with a lower `min_primitives` for those.
pub fn generate(
    primitives: &[GaussianPrimitive],
    bounds: Aabb,
    settings: &ScaffoldSettings,
) -> Result<ScaffoldMesh, ScaffoldError> {
    generate_with_stats(primitives, bounds, settings, &OctreeConfig::default()).map(|(mesh, _)| mesh)
}

/// Generate a scaffold mesh and report per-stage counts.
pub fn generate_with_stats(
    primitives: &[GaussianPrimitive],
    bounds: Aabb,
    settings: &ScaffoldSettings,
    config: &OctreeConfig,
) -> Result<(ScaffoldMesh, GenerationStats), ScaffoldError> {
    settings.validate().map_err(ScaffoldError::InvalidSettings)?;

    let primitives: Cow<'_, [GaussianPrimitive]> = if settings.scale == 1.0 {
        Cow::Borrowed(primitives)
    } else {
        debug!(scale = settings.scale, "scaling primitives");
        Cow::Owned(primitives.iter().map(|p| p.scaled(settings.scale)).collect())
    };
    let field = DensityField::new(&primitives, settings.threshold);

    let mut tree = Octree::build(&field, bounds, settings.depth_levels(), config)?;
    let potential_leaves = tree
        .leaves()
        .filter(|&id| tree.node(id).contains_potential_surface)
        .count();

    let classification = classify_surface(&mut tree);
    let (edges, roots) = solve_edge_roots(&mut tree, &field);
    let (mesh, meshing) = triangulate_edges(&tree, &edges);

    let stats = GenerationStats {
        nodes: tree.len(),
        leaves: tree.leaf_count(),
        potential_leaves,
        edges: edges.len(),
        classification,
        roots,
        meshing,
    };
    info!(
        primitives = primitives.len(),
        nodes = stats.nodes,
        surface_leaves = stats.classification.surface_leaves,
        vertices = mesh.vertices.len(),
        triangles = mesh.triangle_count(),
        "scaffold mesh generated"
    );
    Ok((mesh, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn sphere_config() -> OctreeConfig {
        OctreeConfig {
            min_primitives: 1,
            ..OctreeConfig::default()
        }
    }

    #[test]
    fn test_strategy_default_and_serde() {
        assert_eq!(MeshingStrategy::default(), MeshingStrategy::OctreeSurfaceNets);
        let mesh = MeshingStrategy::default()
            .generate(&[], Aabb::new(Vec3::splat(-1.0), Vec3::ONE), &ScaffoldSettings::default())
            .unwrap();
        assert!(mesh.is_empty());

        let json = serde_json::to_string(&MeshingStrategy::OctreeSurfaceNets).unwrap();
        assert_eq!(json, "\"OctreeSurfaceNets\"");
        let parsed: MeshingStrategy = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, MeshingStrategy::default());
    }

    #[test]
    fn test_default_config_skips_single_splat() {
        let prims = vec![GaussianPrimitive::isotropic(Vec3::ZERO, 1.0, 1.0)];
        let bounds = Aabb::new(Vec3::splat(-2.0), Vec3::splat(2.0));
        let settings = ScaffoldSettings::new(0.5, 3);
        assert_eq!(generate(&prims, bounds, &settings).unwrap().triangle_count(), 0);

        let (mesh, _) = generate_with_stats(&prims, bounds, &settings, &sphere_config()).unwrap();
        assert!(mesh.triangle_count() > 0);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = ScaffoldSettings::new(0.5, -2);
        let err = generate(&[], Aabb::new(Vec3::ZERO, Vec3::ONE), &settings).unwrap_err();
        assert!(matches!(err, ScaffoldError::InvalidSettings(_)));
    }

    #[test]
    fn test_scale_grows_the_shell() {
        let prims = vec![GaussianPrimitive::isotropic(Vec3::ZERO, 1.0, 1.0)];
        let bounds = Aabb::new(Vec3::splat(-4.0), Vec3::splat(4.0));
        let mean_radius = |scale: f32| {
            let settings = ScaffoldSettings::new(0.5, 4).with_scale(scale);
            let (mesh, _) = generate_with_stats(&prims, bounds, &settings, &sphere_config()).unwrap();
            assert!(!mesh.vertices.is_empty());
            mesh.vertices.iter().map(|v| v.length()).sum::<f32>() / mesh.vertices.len() as f32
        };
        assert!(mean_radius(2.0) > mean_radius(1.0) * 1.5);
    }

    #[test]
    fn test_stats_are_consistent() {
        let prims = vec![GaussianPrimitive::isotropic(Vec3::ZERO, 1.0, 1.0)];
        let bounds = Aabb::new(Vec3::splat(-2.0), Vec3::splat(2.0));
        let (mesh, stats) =
            generate_with_stats(&prims, bounds, &ScaffoldSettings::new(0.5, 3), &sphere_config())
                .unwrap();

        assert_eq!(stats.edges, stats.meshing.triangulated_edges + stats.meshing.skipped_edges);
        assert_eq!(stats.roots.surface_leaves, stats.classification.surface_leaves);
        assert!(stats.classification.surface_leaves <= stats.potential_leaves);
        assert_eq!(mesh.indices.len() % 3, 0);
    }
}
