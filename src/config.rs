//! Precomputation settings
use crate::{
    bvh::{Aabb, DEFAULT_MAX_TRIANGLES_PER_LEAF},
    PrtError, Result,
};

/// How far a ray origin is pushed along the vertex normal before tracing
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RayOffset {
    /// fraction of the scene's bounding box diagonal
    Relative(f64),
    /// in scene units
    Absolute(f64),
}

impl Default for RayOffset {
    fn default() -> Self {
        Self::Relative(1e-4)
    }
}

impl RayOffset {
    /// The offset distance for a scene with the given bounds
    #[must_use]
    pub fn resolve(self, scene_bounds: &Aabb) -> f64 {
        match self {
            Self::Relative(fraction) => fraction * scene_bounds.diagonal(),
            Self::Absolute(distance) => distance,
        }
    }
}

/// Settings of a transfer precomputation pass
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PrtConfig {
    /// Monte Carlo directions per vertex, shared by all vertices of a pass
    pub sample_count: usize,
    /// leaf capacity of the spatial index
    pub max_triangles_per_leaf: usize,
    pub ray_offset: RayOffset,
    /// Seed of the sample set. `None` draws a new set every pass.
    pub seed: Option<u64>,
}

impl Default for PrtConfig {
    fn default() -> Self {
        Self {
            sample_count: 50,
            max_triangles_per_leaf: DEFAULT_MAX_TRIANGLES_PER_LEAF,
            ray_offset: RayOffset::default(),
            seed: None,
        }
    }
}

impl PrtConfig {
    /// # Errors
    /// [`PrtError::InvalidConfig`] for a zero sample count or a negative or non finite offset
    pub fn validate(&self) -> Result<()> {
        if self.sample_count == 0 {
            return Err(PrtError::InvalidConfig("sample_count must be positive".into()));
        }
        let (RayOffset::Relative(offset) | RayOffset::Absolute(offset)) = self.ray_offset;
        if !offset.is_finite() || offset < 0.0 {
            return Err(PrtError::InvalidConfig(format!(
                "ray offset {offset} must be finite and not negative"
            )));
        }
        Ok(())
    }
}
