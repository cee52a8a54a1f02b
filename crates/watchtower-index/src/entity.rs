//! Entity handles and per-entity records.

use slotmap::new_key_type;

use crate::{CellCoord, Neighbor, Position};

new_key_type! {
    /// Stable handle for registered entities backed by a generational slot map.
    pub struct EntityId;
}

/// A tracked point before registration (or after it has left a manager).
///
/// The radius is fixed for as long as the entity stays registered; the
/// position is owned by the manager and supplied on `enter`/`moved`.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity<P, L> {
    /// Half-width of the square interest footprint.
    pub radius: f32,
    /// Caller data; never interpreted by the index.
    pub payload: P,
    /// Receives enter/leave notifications about other entities.
    pub listener: L,
}

impl<P, L> Entity<P, L> {
    #[must_use]
    pub const fn new(radius: f32, payload: P, listener: L) -> Self {
        Self {
            radius,
            payload,
            listener,
        }
    }
}

/// Manager-side state for a registered entity.
#[derive(Debug, Clone)]
pub(crate) struct EntityRecord<P> {
    pub(crate) position: Position,
    pub(crate) radius: f32,
    pub(crate) payload: P,
    /// Cell holding this entity as an occupant.
    pub(crate) home: CellCoord,
}

impl<P> EntityRecord<P> {
    pub(crate) fn neighbor(&self, id: EntityId) -> Neighbor<'_, P> {
        Neighbor {
            id,
            position: self.position,
            radius: self.radius,
            payload: &self.payload,
        }
    }
}
