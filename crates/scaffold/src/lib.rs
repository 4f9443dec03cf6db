//! Scaffold mesh extraction from 3D Gaussian splats.
//!
//! Converts a set of anisotropic Gaussian primitives into a coarse triangle
//! mesh approximating the iso-surface of their summed density field. The
//! mesh is a scaffold for downstream finishing, not a final surface.
//!
//! # Architecture
//!
//! Data flows strictly forward through five stages:
//!
//! - **Density**: evaluates the summed Gaussian field against the iso level
//! - **Octree**: adaptive breadth-first subdivision around potential surface,
//!   plus face/edge/corner neighbor queries on the non-conforming result
//! - **Classify**: flood fill from the exterior separating true surface
//!   leaves from enclosed ones
//! - **Edge roots**: per-leaf edge scan, bisection and dual vertex placement
//! - **Mesher**: one triangle fan per edge shared by at least three leaves
//!
//! [`pipeline::generate`] runs a full pass.

pub mod budget;
pub mod classify;
pub mod density;
pub mod edge_roots;
pub mod error;
pub mod mesher;
pub mod octree;
pub mod pipeline;
pub mod types;

pub use classify::{ClassificationStats, classify_surface};
pub use density::DensityField;
pub use edge_roots::{EdgeEntry, EdgeKey, EdgeMap, RootSolveStats, solve_edge_roots};
pub use error::ScaffoldError;
pub use mesher::{MeshingStats, triangulate_edges};
pub use octree::{Direction, NodeId, Octree, OctreeNode};
pub use pipeline::{GenerationStats, MeshingStrategy, generate, generate_with_stats};
pub use scaffold_config::ScaffoldSettings;
pub use types::{Aabb, GaussianPrimitive, OctreeConfig, ScaffoldMesh};
