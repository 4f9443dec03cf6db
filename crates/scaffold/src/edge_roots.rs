//! Per-leaf edge scan and dual vertex placement.
//!
//! Every surface leaf evaluates the field at the ends of its 12 cube edges.
//! Each edge is recorded in the [`EdgeMap`] whether or not it crosses the
//! surface, so the mesher can see every leaf that shares a physical edge,
//! even across depth changes. Crossing edges are bisected and the leaf's
//! dual vertex is the mean of its crossing points.

use std::collections::BTreeMap;
use std::collections::btree_map;

use glam::{UVec3, Vec3};
use tracing::debug;

use crate::density::DensityField;
use crate::octree::{NodeId, Octree};

/// Fixed bisection iteration count per crossing edge.
pub const BISECTION_ITERATIONS: usize = 20;

/// Bisection stops early once the field is this close to zero.
pub const BISECTION_TOLERANCE: f32 = 1e-6;

/// The 12 edges of a cell as pairs of corner indices.
///
/// Corner `i` has bit 0 = +x, bit 1 = +y, bit 2 = +z:
/// ```text
/// 0: (min.x, min.y, min.z)    4: (min.x, min.y, max.z)
/// 1: (max.x, min.y, min.z)    5: (max.x, min.y, max.z)
/// 2: (min.x, max.y, min.z)    6: (min.x, max.y, max.z)
/// 3: (max.x, max.y, min.z)    7: (max.x, max.y, max.z)
/// ```
pub const CELL_EDGES: [(usize, usize); 12] = [
    // X edges
    (0, 1),
    (2, 3),
    (4, 5),
    (6, 7),
    // Y edges
    (0, 2),
    (1, 3),
    (4, 6),
    (5, 7),
    // Z edges
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// A physical edge, identified by its endpoints on the finest-cell lattice.
///
/// Every leaf corner is an exact lattice point, so leaves at different depths
/// agree on the key regardless of float rounding in their bounds. Endpoints
/// are stored in lexicographic order, so the key is independent of which
/// leaf recorded the edge and of its density orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    a: [u32; 3],
    b: [u32; 3],
}

impl EdgeKey {
    pub fn new(p: UVec3, q: UVec3) -> Self {
        let (p, q) = (p.to_array(), q.to_array());
        if p <= q {
            Self { a: p, b: q }
        } else {
            Self { a: q, b: p }
        }
    }

    pub fn endpoints(&self) -> ([u32; 3], [u32; 3]) {
        (self.a, self.b)
    }
}

/// All leaves that recorded one physical edge.
#[derive(Debug, Clone)]
pub struct EdgeEntry {
    /// Lower-density endpoint, as seen by the first contributor.
    pub low: Vec3,
    /// Higher-density endpoint, as seen by the first contributor.
    pub high: Vec3,
    /// Contributing leaves in recording order.
    pub leaves: Vec<NodeId>,
}

impl EdgeEntry {
    /// Direction of increasing density along the edge.
    pub fn direction(&self) -> Vec3 {
        self.high - self.low
    }
}

/// Physical edge to contributing leaves, iterated in key order.
#[derive(Debug, Clone, Default)]
pub struct EdgeMap {
    entries: BTreeMap<EdgeKey, EdgeEntry>,
}

impl EdgeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `leaf` owns the edge `key`, oriented `low` to `high`.
    pub fn record(&mut self, key: EdgeKey, low: Vec3, high: Vec3, leaf: NodeId) {
        self.entries
            .entry(key)
            .or_insert_with(|| EdgeEntry {
                low,
                high,
                leaves: Vec::new(),
            })
            .leaves
            .push(leaf);
    }

    pub fn get(&self, key: &EdgeKey) -> Option<&EdgeEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, EdgeKey, EdgeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counts gathered during the edge scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootSolveStats {
    pub surface_leaves: usize,
    pub crossing_edges: usize,
    /// Surface leaves with no crossing edge, placed at their center.
    pub center_fallbacks: usize,
}

/// Locate the zero crossing of `f` on the segment `a`..`b`.
///
/// `fa` is `f(a)`; the caller guarantees `f(a)` and `f(b)` differ in sign.
/// Runs [`BISECTION_ITERATIONS`] halvings, returning early when the
/// midpoint value drops below [`BISECTION_TOLERANCE`].
pub fn bisect(a: Vec3, b: Vec3, fa: f32, mut f: impl FnMut(Vec3) -> f32) -> Vec3 {
    let (mut lo, mut hi) = (a, b);
    let lo_inside = fa >= 0.0;

    for _ in 0..BISECTION_ITERATIONS {
        let mid = (lo + hi) * 0.5;
        let value = f(mid);
        if value.abs() < BISECTION_TOLERANCE {
            return mid;
        }
        if (value >= 0.0) == lo_inside {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    (lo + hi) * 0.5
}

/// Scan the edges of every surface leaf, place dual vertices and build the
/// edge map.
pub fn solve_edge_roots(tree: &mut Octree, field: &DensityField<'_>) -> (EdgeMap, RootSolveStats) {
    let mut edges = EdgeMap::new();
    let mut stats = RootSolveStats::default();

    let surface: Vec<NodeId> = tree.surface_leaves().collect();
    for id in surface {
        let node = tree.node(id);
        let corners = node.corners();
        let lattice: [UVec3; 8] = std::array::from_fn(|i| tree.lattice_corner(id, i));
        let values = corners.map(|c| field.evaluate(c, &node.candidates));

        let mut crossing_sum = Vec3::ZERO;
        let mut crossing_count = 0usize;
        for (i, j) in CELL_EDGES {
            let (low, high) = if values[i] <= values[j] {
                (corners[i], corners[j])
            } else {
                (corners[j], corners[i])
            };
            edges.record(EdgeKey::new(lattice[i], lattice[j]), low, high, id);

            if (values[i] >= 0.0) != (values[j] >= 0.0) {
                let candidates = &node.candidates;
                crossing_sum += bisect(corners[i], corners[j], values[i], |p| {
                    field.evaluate(p, candidates)
                });
                crossing_count += 1;
            }
        }

        let vertex = if crossing_count > 0 {
            crossing_sum / crossing_count as f32
        } else {
            stats.center_fallbacks += 1;
            node.center
        };
        stats.surface_leaves += 1;
        stats.crossing_edges += crossing_count;
        tree.node_mut(id).vertex_position = Some(vertex);
    }

    debug!(
        surface_leaves = stats.surface_leaves,
        edges = edges.len(),
        crossings = stats.crossing_edges,
        "edge roots solved"
    );
    (edges, stats)
}
