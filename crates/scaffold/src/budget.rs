//! Node budget for octree construction.
//!
//! Deep trees over many overlapping primitives can grow without bound. The
//! budget caps the arena size so a pathological input fails fast instead of
//! exhausting memory.

use crate::error::ScaffoldError;

/// Tracks arena growth against a hard node limit.
#[derive(Debug, Clone)]
pub struct NodeBudget {
    /// Maximum nodes allowed in the arena
    pub max_nodes: usize,
    /// Nodes allocated so far
    pub current_nodes: usize,
    /// Nodes still available (negative = over budget)
    pub remaining: isize,
}

impl NodeBudget {
    /// Create a budget with the given node limit.
    pub fn new(max_nodes: usize) -> Self {
        Self {
            max_nodes,
            current_nodes: 0,
            remaining: max_nodes.min(isize::MAX as usize) as isize,
        }
    }

    /// Whether `count` more nodes fit in the budget.
    pub fn can_allocate(&self, count: usize) -> bool {
        self.remaining >= count.min(isize::MAX as usize) as isize
    }

    /// Claim `count` nodes, failing if the limit would be exceeded.
    pub fn reserve(&mut self, count: usize) -> Result<(), ScaffoldError> {
        if !self.can_allocate(count) {
            return Err(ScaffoldError::NodeBudgetExceeded {
                limit: self.max_nodes,
                requested: self.current_nodes.saturating_add(count),
            });
        }
        self.current_nodes += count;
        self.remaining -= count as isize;
        Ok(())
    }
}
