//! Static grid configuration.

use serde::{Deserialize, Serialize};

use crate::GridError;

/// World bounds and cell size for a [`TowerGrid`](crate::TowerGrid).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Lower bound of the world on the x axis.
    pub min_x: f32,
    /// Upper bound of the world on the x axis.
    pub max_x: f32,
    /// Lower bound of the world on the y axis.
    pub min_y: f32,
    /// Upper bound of the world on the y axis.
    pub max_y: f32,
    /// Edge length of one square cell in world units.
    pub cell_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: 1_000.0,
            min_y: 0.0,
            max_y: 1_000.0,
            cell_size: 50.0,
        }
    }
}

impl GridConfig {
    /// Construct a configuration from explicit bounds.
    #[must_use]
    pub const fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32, cell_size: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            cell_size,
        }
    }

    /// Reject configurations that cannot describe a grid.
    pub fn validate(&self) -> Result<(), GridError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(GridError::InvalidConfig(
                "cell_size must be finite and positive",
            ));
        }
        if ![self.min_x, self.max_x, self.min_y, self.max_y]
            .iter()
            .all(|bound| bound.is_finite())
        {
            return Err(GridError::InvalidConfig("world bounds must be finite"));
        }
        if self.max_x <= self.min_x {
            return Err(GridError::InvalidConfig("max_x must be greater than min_x"));
        }
        if self.max_y <= self.min_y {
            return Err(GridError::InvalidConfig("max_y must be greater than min_y"));
        }
        Ok(())
    }
}
