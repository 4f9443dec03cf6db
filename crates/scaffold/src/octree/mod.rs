//! Adaptive octree over the splat set.
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. Parents
//! own their children (by handle) and children keep a plain back-reference,
//! so upward walks stay O(depth) without any ownership cycle.
//!
//! # Octant convention
//!
//! Child `i` of a node sits on the positive side of the X axis iff bit 0 of
//! `i` is set, Y for bit 1 and Z for bit 2. Corners use the same encoding.
//! Neighbor finding and the edge table both rely on it.
//!
//! # Cell lattice
//!
//! Besides its float bounds every node carries its minimum corner on the
//! integer lattice of finest cells (`max_depth` levels below the root). A
//! node at depth `d` spans `2^(max_depth - d)` lattice steps per axis.
//! Adjacency and edge identity are decided on this lattice, so they do not
//! depend on where the bounds sit in float space.

mod build;
pub mod neighbors;

pub use neighbors::Direction;

use glam::{UVec3, Vec3};

use crate::types::Aabb;

/// Deepest tree the lattice supports; keeps lattice coordinates well inside
/// `u32` and the finest cell size meaningful in `f32`.
pub const MAX_TREE_DEPTH: u32 = scaffold_config::MAX_SUPPORTED_DEPTH as u32;

/// Type-safe octree node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Sign vector (-1/+1 per axis) of octant or corner `index`.
pub fn octant_signs(index: usize) -> Vec3 {
    Vec3::new(
        if index & 1 != 0 { 1.0 } else { -1.0 },
        if index & 2 != 0 { 1.0 } else { -1.0 },
        if index & 4 != 0 { 1.0 } else { -1.0 },
    )
}

/// 0/1 offset per axis of octant or corner `index`.
pub fn octant_bits(index: usize) -> UVec3 {
    UVec3::new(
        (index & 1) as u32,
        ((index >> 1) & 1) as u32,
        ((index >> 2) & 1) as u32,
    )
}

/// A node in the octree (either internal or leaf).
#[derive(Debug, Clone)]
pub struct OctreeNode {
    pub center: Vec3,
    pub half_extent: Vec3,
    /// Depth of this node (root = 0).
    pub depth: u32,
    /// Minimum corner on the finest-cell lattice.
    pub lattice_min: UVec3,
    /// Back-reference; `None` only for the root.
    pub parent: Option<NodeId>,
    /// Owned children, present iff the node is internal.
    pub children: Option<[NodeId; 8]>,
    /// Indices of primitives whose bounds touch this node. Empty once split.
    pub candidates: Vec<u32>,
    pub contains_potential_surface: bool,
    /// Set by the flood fill on surface leaves and their ancestors.
    pub contains_surface: bool,
    /// Set by the flood fill on reached non-surface leaves.
    pub outside: bool,
    /// Dual vertex; defined iff leaf and `contains_surface`.
    pub vertex_position: Option<Vec3>,
}

impl OctreeNode {
    fn new(
        center: Vec3,
        half_extent: Vec3,
        depth: u32,
        lattice_min: UVec3,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            center,
            half_extent,
            depth,
            lattice_min,
            parent,
            children: None,
            candidates: Vec::new(),
            contains_potential_surface: false,
            contains_surface: false,
            outside: false,
            vertex_position: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_half_extent(self.center, self.half_extent)
    }

    /// Position of corner `index` (0-7, octant encoding).
    pub fn corner(&self, index: usize) -> Vec3 {
        self.center + octant_signs(index) * self.half_extent
    }

    pub fn corners(&self) -> [Vec3; 8] {
        std::array::from_fn(|i| self.corner(i))
    }

    /// Get the octant index for a point (0-7).
    pub fn octant_for_point(&self, point: Vec3) -> usize {
        let mut index = 0;
        if point.x >= self.center.x {
            index |= 1;
        }
        if point.y >= self.center.y {
            index |= 2;
        }
        if point.z >= self.center.z {
            index |= 4;
        }
        index
    }
}

/// Arena-backed adaptive octree.
///
/// One tree is built per generation pass and dropped wholesale afterwards;
/// there is no incremental update.
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    bounds: Aabb,
    max_depth: u32,
}

impl Octree {
    /// Tree consisting of a single non-surface root leaf.
    ///
    /// `max_depth` must not exceed [`MAX_TREE_DEPTH`]; [`Octree::build`]
    /// checks it before calling this.
    pub(crate) fn with_root(bounds: Aabb, max_depth: u32) -> Self {
        debug_assert!(max_depth <= MAX_TREE_DEPTH);
        let root = OctreeNode::new(bounds.center(), bounds.half_extent(), 0, UVec3::ZERO, None);
        Self {
            nodes: vec![root],
            bounds,
            max_depth,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn node(&self, id: NodeId) -> &OctreeNode {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut OctreeNode {
        &mut self.nodes[id.index()]
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node handles in arena order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Leaf handles in arena order.
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids().filter(move |&id| self.node(id).is_leaf())
    }

    /// Leaves confirmed as surface by classification, in arena order.
    pub fn surface_leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.leaves().filter(move |&id| self.node(id).contains_surface)
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Edge length of a cell at `max_depth`, per axis.
    pub fn finest_cell_size(&self) -> Vec3 {
        self.bounds.size() / self.lattice_extent() as f32
    }

    /// Finest cells along each axis of the root.
    pub fn lattice_extent(&self) -> u32 {
        1 << self.max_depth
    }

    /// Lattice steps spanned by `id` along each axis.
    pub fn cell_span(&self, id: NodeId) -> u32 {
        1 << (self.max_depth - self.node(id).depth)
    }

    /// Lattice coordinates of corner `index` (octant encoding) of `id`.
    pub fn lattice_corner(&self, id: NodeId, index: usize) -> UVec3 {
        self.node(id).lattice_min + octant_bits(index) * self.cell_span(id)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |&p| self.node(p).parent)
    }

    /// The leaf reached by always descending into child 0.
    pub fn first_leaf(&self) -> NodeId {
        let mut current = self.root();
        while let Some(children) = self.node(current).children {
            current = children[0];
        }
        current
    }

    /// Find the leaf containing `point`, or `None` outside the root bounds.
    pub fn find_leaf_containing(&self, point: Vec3) -> Option<NodeId> {
        if !self.bounds.contains_point(point) {
            return None;
        }
        let mut current = self.root();
        while let Some(children) = self.node(current).children {
            current = children[self.node(current).octant_for_point(point)];
        }
        Some(current)
    }

    /// Split a leaf into 8 children with empty candidate lists.
    ///
    /// Returns the child handles in octant order.
    pub(crate) fn subdivide(&mut self, id: NodeId) -> [NodeId; 8] {
        let (center, half_extent, depth, lattice_min) = {
            let node = self.node(id);
            debug_assert!(node.is_leaf(), "subdivide called on internal node");
            debug_assert!(node.depth < self.max_depth, "subdivide below max_depth");
            (node.center, node.half_extent, node.depth, node.lattice_min)
        };
        let child_half = half_extent * 0.5;
        let child_span = self.cell_span(id) / 2;
        let first = self.nodes.len() as u32;
        let children: [NodeId; 8] = std::array::from_fn(|i| NodeId(first + i as u32));

        for octant in 0..8 {
            let child_center = center + octant_signs(octant) * child_half;
            let child_min = lattice_min + octant_bits(octant) * child_span;
            self.nodes.push(OctreeNode::new(
                child_center,
                child_half,
                depth + 1,
                child_min,
                Some(id),
            ));
        }

        let node = self.node_mut(id);
        node.children = Some(children);
        node.candidates = Vec::new();
        children
    }

    /// Fully subdivided tree of the given depth with no candidates.
    ///
    /// Internal nodes are flagged as potential surface to keep the flag
    /// hierarchy consistent; leaves start unflagged.
    #[cfg(test)]
    pub(crate) fn uniform(bounds: Aabb, depth: u32) -> Self {
        let mut tree = Self::with_root(bounds, depth);
        let mut layer = vec![tree.root()];
        for _ in 0..depth {
            let mut next = Vec::with_capacity(layer.len() * 8);
            for id in layer {
                tree.node_mut(id).contains_potential_surface = true;
                next.extend(tree.subdivide(id));
            }
            layer = next;
        }
        tree
    }
}
