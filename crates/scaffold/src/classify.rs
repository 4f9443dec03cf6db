//! Surface classification by flood fill.
//!
//! Potential-surface leaves are only kept as surface if they can be reached
//! from open space. The fill starts at the leaf found by always descending
//! into child 0. Empty leaves flood to every neighbor; potential-surface
//! leaves are marked and only spread to other potential-surface leaves, so
//! the fill runs along a shell without entering the region it encloses.
//!
//! Potential-surface pockets that are never reached stay unmarked and emit no
//! geometry. This also drops interior cavities disconnected from the seed.

use std::collections::VecDeque;

use tracing::debug;

use crate::octree::{NodeId, Octree};

/// Counts gathered during one classification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationStats {
    /// Leaves popped from the work queue.
    pub visited: usize,
    /// Leaves marked `contains_surface`.
    pub surface_leaves: usize,
    /// Leaves marked `outside`.
    pub outside_leaves: usize,
    /// Potential-surface leaves the fill never reached.
    pub unreached_potential: usize,
}

/// Flood-fill the tree from its first leaf, setting `contains_surface` and
/// `outside` flags.
pub fn classify_surface(tree: &mut Octree) -> ClassificationStats {
    let mut stats = ClassificationStats::default();
    let seed = tree.first_leaf();

    let mut visited = vec![false; tree.len()];
    let mut queue = VecDeque::from([seed]);
    visited[seed.index()] = true;

    while let Some(id) = queue.pop_front() {
        stats.visited += 1;
        let neighbors = tree.all_neighbors(id);

        if tree.node(id).contains_potential_surface {
            mark_surface_upward(tree, id);
            stats.surface_leaves += 1;
            for n in neighbors {
                if !visited[n.index()] && tree.node(n).contains_potential_surface {
                    visited[n.index()] = true;
                    queue.push_back(n);
                }
            }
        } else {
            tree.node_mut(id).outside = true;
            stats.outside_leaves += 1;
            for n in neighbors {
                if !visited[n.index()] {
                    visited[n.index()] = true;
                    queue.push_back(n);
                }
            }
        }
    }

    stats.unreached_potential = tree
        .leaves()
        .filter(|&id| tree.node(id).contains_potential_surface && !visited[id.index()])
        .count();
    if stats.unreached_potential > 0 {
        debug!(
            unreached = stats.unreached_potential,
            "potential-surface leaves unreachable from seed, treated as interior"
        );
    }
    debug!(
        visited = stats.visited,
        surface = stats.surface_leaves,
        outside = stats.outside_leaves,
        "surface classification complete"
    );
    stats
}

/// Mark `id` and its ancestors up to the first one already marked.
fn mark_surface_upward(tree: &mut Octree, id: NodeId) {
    let mut current = Some(id);
    while let Some(node_id) = current {
        let node = tree.node_mut(node_id);
        if node.contains_surface && node_id != id {
            break;
        }
        node.contains_surface = true;
        current = node.parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Aabb;
    use glam::Vec3;

    /// Depth-3 uniform grid over [0,8]^3 with unit cells, flagging leaves by
    /// their integer cell coordinate.
    fn flagged_grid(is_potential: impl Fn(i32, i32, i32) -> bool) -> Octree {
        let mut tree = Octree::uniform(Aabb::new(Vec3::ZERO, Vec3::splat(8.0)), 3);
        let leaves: Vec<NodeId> = tree.leaves().collect();
        for id in leaves {
            let c = tree.node(id).center;
            let (x, y, z) = (c.x.floor() as i32, c.y.floor() as i32, c.z.floor() as i32);
            tree.node_mut(id).contains_potential_surface = is_potential(x, y, z);
        }
        tree
    }

    fn ring(x: i32, y: i32, z: i32) -> i32 {
        // Chebyshev distance from the grid's outer boundary
        [x, y, z, 7 - x, 7 - y, 7 - z].into_iter().min().unwrap()
    }

    fn cell(tree: &Octree, x: i32, y: i32, z: i32) -> NodeId {
        tree.find_leaf_containing(Vec3::new(x as f32 + 0.5, y as f32 + 0.5, z as f32 + 0.5))
            .unwrap()
    }

    #[test]
    fn test_shell_is_marked_from_exterior_seed() {
        // ring 0 empty, ring 1 shell, rings 2-3 empty interior
        let mut tree = flagged_grid(|x, y, z| ring(x, y, z) == 1);
        let stats = classify_surface(&mut tree);

        assert_eq!(stats.unreached_potential, 0);
        assert!(tree.node(cell(&tree, 1, 1, 1)).contains_surface);
        assert!(tree.node(cell(&tree, 0, 3, 3)).outside);
        // The fill never enters the enclosed region
        let inner = tree.node(cell(&tree, 3, 3, 3));
        assert!(!inner.outside && !inner.contains_surface);
        assert!(tree.node(tree.root()).contains_surface);
    }

    #[test]
    fn test_disconnected_cavity_is_not_surfaced() {
        // Outer shell at ring 1, a separate pocket at ring 3 behind an empty gap
        let mut tree = flagged_grid(|x, y, z| matches!(ring(x, y, z), 1 | 3));
        let stats = classify_surface(&mut tree);

        let pocket = tree.node(cell(&tree, 3, 4, 3));
        assert!(pocket.contains_potential_surface);
        assert!(!pocket.contains_surface);
        assert_eq!(stats.unreached_potential, 8);
        assert_eq!(stats.surface_leaves, 6 * 6 * 6 - 4 * 4 * 4);
    }

    #[test]
    fn test_potential_seed_spreads_only_through_potential() {
        // Seed corner is potential and connected to a slab along x = 0
        let mut tree = flagged_grid(|x, _, _| x == 0);
        let stats = classify_surface(&mut tree);

        assert_eq!(stats.surface_leaves, 64);
        assert_eq!(stats.outside_leaves, 0);
        assert!(!tree.node(cell(&tree, 4, 4, 4)).outside);
    }

    #[test]
    fn test_surface_implies_potential_and_ancestors_marked() {
        let mut tree = flagged_grid(|x, y, z| ring(x, y, z) == 1);
        classify_surface(&mut tree);

        for id in tree.ids() {
            let node = tree.node(id);
            if node.contains_surface {
                assert!(node.contains_potential_surface);
                for ancestor in tree.ancestors(id) {
                    assert!(tree.node(ancestor).contains_surface);
                }
            }
        }
    }

    #[test]
    fn test_single_leaf_tree() {
        let mut tree = Octree::with_root(Aabb::new(Vec3::ZERO, Vec3::ONE), 0);
        let stats = classify_surface(&mut tree);
        assert_eq!(stats.visited, 1);
        assert!(tree.node(tree.root()).outside);
    }
}
