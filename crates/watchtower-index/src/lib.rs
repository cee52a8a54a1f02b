//! Tower-partitioned area-of-interest index.
//!
//! The world rectangle is split into fixed-size cells ("towers"). Each cell
//! remembers which entities physically stand in it (*occupants*) and which
//! entities have it inside their interest footprint (*observers*). Entering,
//! leaving and moving an entity only touches the cells whose relationship to
//! that entity changed, and the resulting enter/leave notifications are
//! delivered to each entity's [`AoiListener`] before the call returns.
//!
//! Visibility is a cell-membership test: an observer sees every occupant of
//! every cell intersecting the square `[x - r, x + r] × [y - r, y + r]`.
//! Listeners that need an exact circular cutoff can post-filter with
//! [`Neighbor::distance_squared`].

use serde::{Deserialize, Serialize};

pub mod brute;
pub mod cell;
pub mod config;
pub mod entity;
pub mod error;
pub mod grid;
pub mod layout;
pub mod listener;
pub mod visible;

pub use brute::BruteForceAoi;
pub use cell::{AoiEvent, Cell, EventKind};
pub use config::GridConfig;
pub use entity::{Entity, EntityId};
pub use error::{CellError, GridError};
pub use grid::TowerGrid;
pub use layout::{CellCoord, CellLayout, Footprint};
pub use listener::{AoiListener, EventLog, Neighbor};
pub use visible::VisibleSet;

/// Planar position in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to `other`.
    #[must_use]
    pub fn distance_squared(self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Common behaviour exposed by area-of-interest managers.
///
/// A manager takes ownership of an [`Entity`] on `enter` and hands it back on
/// `leave`, so an entity can never be registered twice at once.
pub trait AoiManager<P, L> {
    /// Register `entity` at `position`, notifying both the entrant and every
    /// entity already watching its home cell.
    fn enter(&mut self, entity: Entity<P, L>, position: Position) -> Result<EntityId, GridError>;

    /// Deregister `id`, notifying its watchers and the entity itself.
    fn leave(&mut self, id: EntityId) -> Result<Entity<P, L>, GridError>;

    /// Relocate `id` to `position`, notifying only the parties whose
    /// visibility actually changed.
    fn moved(&mut self, id: EntityId, position: Position) -> Result<(), GridError>;

    /// Borrow the listener registered for `id`.
    fn listener(&self, id: EntityId) -> Option<&L>;

    /// Number of registered entities.
    fn len(&self) -> usize;

    /// Returns true when no entities are registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
