//! Errors surfaced by a generation pass.

use thiserror::Error;

/// Errors that abort a generation pass.
///
/// A pass is atomic: on any error the partially built octree is dropped and
/// no mesh is returned.
#[derive(Debug, Error, PartialEq)]
pub enum ScaffoldError {
    #[error("Octree node budget exceeded: {requested} nodes requested, limit is {limit}")]
    NodeBudgetExceeded { limit: usize, requested: usize },
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}
