//! Adjacency queries over a non-conforming octree.
//!
//! Neighbors are found in two steps. [`Octree::neighbor_of_greater_or_equal_size`]
//! climbs to the first ancestor containing a point just past a face and
//! descends back down, never deeper than the starting node. Then
//! [`Octree::neighbors_of_smaller_size`] walks that node's subtree and keeps
//! every leaf that still touches the original node.
//!
//! Edge and corner neighbors chain two or three face steps. Chaining through
//! a larger neighbor overshoots, so the union is filtered by geometric contact
//! at the end.
//!
//! All of it runs on the cell lattice in doubled coordinates: a node spans
//! `[2 * min, 2 * (min + span)]` and the target point sits one half step past
//! the face, on the line through the face center. Target points never land on
//! a cell boundary, and contact is an exact integer overlap test.

use std::collections::VecDeque;

use glam::{UVec3, Vec3};

use super::{NodeId, Octree};

/// One of the six axis-aligned face directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    NegX,
    PosX,
    NegY,
    PosY,
    NegZ,
    PosZ,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::NegX,
        Direction::PosX,
        Direction::NegY,
        Direction::PosY,
        Direction::NegZ,
        Direction::PosZ,
    ];

    /// Axis index (0=x, 1=y, 2=z).
    pub fn axis(self) -> usize {
        match self {
            Direction::NegX | Direction::PosX => 0,
            Direction::NegY | Direction::PosY => 1,
            Direction::NegZ | Direction::PosZ => 2,
        }
    }

    pub fn sign(self) -> f32 {
        match self {
            Direction::NegX | Direction::NegY | Direction::NegZ => -1.0,
            Direction::PosX | Direction::PosY | Direction::PosZ => 1.0,
        }
    }

    pub fn is_positive(self) -> bool {
        self.sign() > 0.0
    }

    pub fn unit(self) -> Vec3 {
        let mut v = Vec3::ZERO;
        v[self.axis()] = self.sign();
        v
    }
}

impl Octree {
    /// The smallest node at least as large as `id` across the face in `direction`.
    ///
    /// Returns `None` when the face lies on the root boundary.
    pub fn neighbor_of_greater_or_equal_size(
        &self,
        id: NodeId,
        direction: Direction,
    ) -> Option<NodeId> {
        let target = self.face_target(id, direction)?;
        let depth = self.node(id).depth;

        let container = self
            .ancestors(id)
            .find(|&a| self.contains_target(a, target))?;

        let mut current = container;
        while let Some(children) = self.node(current).children {
            if self.node(current).depth >= depth {
                break;
            }
            current = children[self.target_octant(current, target)];
        }
        Some(current)
    }

    /// Leaves under `neighbor` (inclusive) that touch `id`.
    pub fn neighbors_of_smaller_size(&self, id: NodeId, neighbor: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut queue = VecDeque::from([neighbor]);

        while let Some(current) = queue.pop_front() {
            if current == id || !self.touches(current, id) {
                continue;
            }
            match self.node(current).children {
                Some(children) => queue.extend(children),
                None => result.push(current),
            }
        }
        result
    }

    /// Leaves sharing a face with `id`.
    pub fn face_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        for direction in Direction::ALL {
            if let Some(n) = self.neighbor_of_greater_or_equal_size(id, direction) {
                result.extend(self.neighbors_of_smaller_size(id, n));
            }
        }
        sorted_unique(result)
    }

    /// Leaves reached by two orthogonal face steps, in both orders.
    pub fn edge_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        for first in Direction::ALL {
            let Some(a) = self.neighbor_of_greater_or_equal_size(id, first) else {
                continue;
            };
            for second in Direction::ALL {
                if second.axis() == first.axis() {
                    continue;
                }
                if let Some(b) = self.neighbor_of_greater_or_equal_size(a, second) {
                    result.extend(self.neighbors_of_smaller_size(id, b));
                }
            }
        }
        sorted_unique(result)
    }

    /// Leaves reached by three face steps along distinct axes.
    pub fn corner_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        for first in Direction::ALL {
            let Some(a) = self.neighbor_of_greater_or_equal_size(id, first) else {
                continue;
            };
            for second in Direction::ALL {
                if second.axis() == first.axis() {
                    continue;
                }
                let Some(b) = self.neighbor_of_greater_or_equal_size(a, second) else {
                    continue;
                };
                for third in Direction::ALL {
                    if third.axis() == first.axis() || third.axis() == second.axis() {
                        continue;
                    }
                    if let Some(c) = self.neighbor_of_greater_or_equal_size(b, third) {
                        result.extend(self.neighbors_of_smaller_size(id, c));
                    }
                }
            }
        }
        sorted_unique(result)
    }

    /// Every leaf touching `id` by face, edge or corner, sorted by handle.
    pub fn all_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = self.face_neighbors(id);
        result.extend(self.edge_neighbors(id));
        result.extend(self.corner_neighbors(id));
        let mut result = sorted_unique(result);
        result.retain(|&n| n != id && self.node(n).is_leaf() && self.touches(n, id));
        result
    }

    /// Closed contact test between two node boxes on the cell lattice.
    pub fn touches(&self, a: NodeId, b: NodeId) -> bool {
        let (a_min, a_max) = self.lattice_range(a);
        let (b_min, b_max) = self.lattice_range(b);
        a_min.cmple(b_max).all() && b_min.cmple(a_max).all()
    }

    fn lattice_range(&self, id: NodeId) -> (UVec3, UVec3) {
        let min = self.node(id).lattice_min;
        (min, min + UVec3::splat(self.cell_span(id)))
    }

    /// Doubled lattice point half a finest step past the face of `id`.
    fn face_target(&self, id: NodeId, direction: Direction) -> Option<UVec3> {
        let min = self.node(id).lattice_min;
        let span = self.cell_span(id);
        let axis = direction.axis();

        let mut target = min * 2 + UVec3::splat(span);
        target[axis] = if direction.is_positive() {
            let face = min[axis] + span;
            if face >= self.lattice_extent() {
                return None;
            }
            face * 2 + 1
        } else {
            if min[axis] == 0 {
                return None;
            }
            min[axis] * 2 - 1
        };
        Some(target)
    }

    fn contains_target(&self, id: NodeId, target: UVec3) -> bool {
        let min = self.node(id).lattice_min * 2;
        let max = min + UVec3::splat(self.cell_span(id) * 2);
        min.cmple(target).all() && target.cmplt(max).all()
    }

    /// Child octant of `id` holding a doubled lattice point.
    fn target_octant(&self, id: NodeId, target: UVec3) -> usize {
        let split = self.node(id).lattice_min * 2 + UVec3::splat(self.cell_span(id));
        let above = target.cmpge(split);
        (above.x as usize) | (above.y as usize) << 1 | (above.z as usize) << 2
    }
}

fn sorted_unique(mut ids: Vec<NodeId>) -> Vec<NodeId> {
    ids.sort_unstable();
    ids.dedup();
    ids
}
