//! Shared configuration for splat scaffold generation
//!
//! This crate provides the single source of truth for the settings a host
//! action passes to the scaffold generator (kernel scale, iso threshold and
//! octree depth), shared between the editor UI and the meshing core.

use serde::{Deserialize, Serialize};

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default multiplier applied to every primitive's per-axis scale
pub const DEFAULT_SCALE: f32 = 1.0;

/// Default iso level of the density field
pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Default maximum octree depth
pub const DEFAULT_MAX_DEPTH: i32 = 6;

/// Deepest octree the generator accepts.
///
/// Octree nodes sit on a lattice of `2^depth` finest cells per axis, held
/// in doubled `u32` coordinates.
pub const MAX_SUPPORTED_DEPTH: i32 = 20;

/// Settings for one scaffold generation pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
pub struct ScaffoldSettings {
    /// Multiplier on each primitive's scale (kernel support size)
    pub scale: f32,
    /// Density iso level the surface is extracted at
    pub threshold: f32,
    /// Maximum subdivision depth (0 = root only)
    pub max_depth: i32,
}

impl Default for ScaffoldSettings {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            threshold: DEFAULT_THRESHOLD,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ScaffoldSettings {
    /// Create settings with the given threshold and depth at unit scale
    pub fn new(threshold: f32, max_depth: i32) -> Self {
        Self {
            scale: DEFAULT_SCALE,
            threshold,
            max_depth,
        }
    }

    /// Builder-style scale override
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Check the settings describe a runnable generation pass.
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if !self.threshold.is_finite() {
            return Err(format!("threshold must be finite, got {}", self.threshold));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(format!("scale must be positive and finite, got {}", self.scale));
        }
        if !(0..=MAX_SUPPORTED_DEPTH).contains(&self.max_depth) {
            return Err(format!(
                "max_depth must be within 0..={}, got {}",
                MAX_SUPPORTED_DEPTH, self.max_depth
            ));
        }
        Ok(())
    }

    /// Get max depth as an unsigned level count (negative depths clamp to 0)
    pub fn depth_levels(&self) -> u32 {
        self.max_depth.max(0) as u32
    }
}
