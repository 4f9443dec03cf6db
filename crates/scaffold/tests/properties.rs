//! Property-based tests over random splat sets.
//!
//! Run with: cargo test -p scaffold --test properties

use glam::{EulerRot, Quat, Vec3};
use proptest::prelude::*;
use scaffold::{
    Aabb, DensityField, GaussianPrimitive, Octree, OctreeConfig, ScaffoldSettings,
    classify_surface, generate_with_stats, solve_edge_roots, triangulate_edges,
};

const DEPTH: u32 = 3;
const THRESHOLD: f32 = 0.5;

fn bounds() -> Aabb {
    Aabb::new(Vec3::splat(-3.0), Vec3::splat(3.0))
}

fn config() -> OctreeConfig {
    OctreeConfig {
        min_primitives: 1,
        ..OctreeConfig::default()
    }
}

// =============================================================================
// Strategies
// =============================================================================

fn arb_primitive() -> impl Strategy<Value = GaussianPrimitive> {
    (
        prop::array::uniform3(-1.5..1.5f32),
        prop::array::uniform3(-3.1..3.1f32),
        prop::array::uniform3(0.2..1.0f32),
        0.2..1.0f32,
    )
        .prop_map(|(center, [a, b, c], scale, opacity)| {
            GaussianPrimitive::new(
                Vec3::from_array(center),
                Quat::from_euler(EulerRot::XYZ, a, b, c),
                Vec3::from_array(scale),
                opacity,
            )
        })
}

fn arb_primitives() -> impl Strategy<Value = Vec<GaussianPrimitive>> {
    prop::collection::vec(arb_primitive(), 1..6)
}

fn classified_tree(prims: &[GaussianPrimitive]) -> Octree {
    let field = DensityField::new(prims, THRESHOLD);
    let mut tree = Octree::build(&field, bounds(), DEPTH, &config()).unwrap();
    classify_surface(&mut tree);
    tree
}

fn overlap_volume(a: &Aabb, b: &Aabb) -> f32 {
    let size = (a.max.min(b.max) - a.min.max(b.min)).max(Vec3::ZERO);
    size.x * size.y * size.z
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Children of every internal node tile it exactly.
    #[test]
    fn children_partition_parent(prims in arb_primitives()) {
        let tree = classified_tree(&prims);
        for node in tree.nodes() {
            let Some(children) = node.children else { continue };
            prop_assert!(node.candidates.is_empty());

            let parent = node.bounds();
            let mut volume = 0.0;
            for (i, &a) in children.iter().enumerate() {
                let child = tree.node(a).bounds();
                prop_assert!(parent.contains_point(child.min) && parent.contains_point(child.max));
                volume += child.volume();
                for &b in &children[i + 1..] {
                    prop_assert!(overlap_volume(&child, &tree.node(b).bounds()) <= 1e-6);
                }
            }
            prop_assert!((volume - parent.volume()).abs() <= parent.volume() * 1e-5);
        }
    }

    /// Leaf candidates are exactly the global primitives touching the leaf.
    #[test]
    fn candidates_filter_monotonically(prims in arb_primitives()) {
        let tree = classified_tree(&prims);
        for id in tree.leaves() {
            let node = tree.node(id);
            let expected: Vec<u32> = prims
                .iter()
                .enumerate()
                .filter(|(_, p)| p.bounds.intersects(&node.bounds()))
                .map(|(i, _)| i as u32)
                .collect();
            prop_assert_eq!(&node.candidates, &expected);

            if let Some(parent) = node.parent {
                let parent_bounds = tree.node(parent).bounds();
                for &i in &node.candidates {
                    prop_assert!(prims[i as usize].bounds.intersects(&parent_bounds));
                }
            }
        }
    }

    /// Classification only confirms nodes that were potential surface.
    #[test]
    fn surface_implies_potential(prims in arb_primitives()) {
        let tree = classified_tree(&prims);
        for id in tree.ids() {
            let node = tree.node(id);
            if node.contains_surface {
                prop_assert!(node.contains_potential_surface);
            }
            prop_assert!(!(node.contains_surface && node.outside));
        }
    }

    /// Only edges with three or more contributors produce triangles.
    #[test]
    fn polygons_need_three_leaves(prims in arb_primitives()) {
        let field = DensityField::new(&prims, THRESHOLD);
        let mut tree = Octree::build(&field, bounds(), DEPTH, &config()).unwrap();
        classify_surface(&mut tree);
        let (edges, _) = solve_edge_roots(&mut tree, &field);
        let (mesh, stats) = triangulate_edges(&tree, &edges);

        let eligible: Vec<usize> = edges
            .iter()
            .map(|(_, entry)| entry.leaves.len())
            .filter(|&n| n >= 3)
            .collect();
        prop_assert_eq!(stats.triangulated_edges, eligible.len());
        prop_assert_eq!(stats.skipped_edges, edges.len() - eligible.len());
        let max_triangles: usize = eligible.iter().map(|n| n - 2).sum();
        prop_assert!(mesh.triangle_count() <= max_triangles);

        for id in tree.ids() {
            let node = tree.node(id);
            prop_assert_eq!(node.vertex_position.is_some(), node.is_leaf() && node.contains_surface);
        }
    }

    /// Repeated passes over the same input are bit-identical.
    #[test]
    fn generation_is_deterministic(prims in arb_primitives()) {
        let settings = ScaffoldSettings::new(THRESHOLD, DEPTH as i32);
        let (first, first_stats) = generate_with_stats(&prims, bounds(), &settings, &config()).unwrap();
        let (second, second_stats) = generate_with_stats(&prims, bounds(), &settings, &config()).unwrap();

        prop_assert_eq!(first.vertex_bytes(), second.vertex_bytes());
        prop_assert_eq!(&first.indices, &second.indices);
        prop_assert_eq!(first_stats, second_stats);
    }
}
