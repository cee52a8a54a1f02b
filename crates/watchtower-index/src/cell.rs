//! A single tower: who stands here and who is watching.
//!
//! Cells decide *who* must be notified; they never call listeners
//! themselves. Every mutator appends [`AoiEvent`]s to a dispatch buffer
//! that the manager drains once the cell sets are settled, so listeners only
//! ever run against a finished snapshot.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{CellCoord, CellError, EntityId};

/// Direction of a visibility change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Enter,
    Leave,
}

/// `observer` gained or lost sight of `subject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AoiEvent {
    pub observer: EntityId,
    pub subject: EntityId,
    pub kind: EventKind,
}

impl AoiEvent {
    #[must_use]
    pub const fn enter(observer: EntityId, subject: EntityId) -> Self {
        Self {
            observer,
            subject,
            kind: EventKind::Enter,
        }
    }

    #[must_use]
    pub const fn leave(observer: EntityId, subject: EntityId) -> Self {
        Self {
            observer,
            subject,
            kind: EventKind::Leave,
        }
    }
}

/// One fixed square of the world.
#[derive(Debug, Clone)]
pub struct Cell {
    coord: CellCoord,
    occupants: HashSet<EntityId>,
    observers: HashSet<EntityId>,
}

impl Cell {
    pub(crate) fn new(coord: CellCoord) -> Self {
        Self {
            coord,
            occupants: HashSet::new(),
            observers: HashSet::new(),
        }
    }

    #[must_use]
    pub const fn coord(&self) -> CellCoord {
        self.coord
    }

    /// Entities physically located in this cell.
    pub fn occupants(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.occupants.iter().copied()
    }

    /// Entities whose footprint includes this cell.
    pub fn observers(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.observers.iter().copied()
    }

    #[must_use]
    pub fn has_occupant(&self, id: EntityId) -> bool {
        self.occupants.contains(&id)
    }

    #[must_use]
    pub fn has_observer(&self, id: EntityId) -> bool {
        self.observers.contains(&id)
    }

    #[must_use]
    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Returns true when nobody stands in or watches this cell.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.occupants.is_empty() && self.observers.is_empty()
    }

    /// Place `id` here.
    ///
    /// Without `from`, every observer learns about the arrival. With `from`
    /// (the cell `id` just left, already without it), observers common to
    /// both cells hear nothing, observers only of `from` get a leave and
    /// observers only of this cell get an enter.
    pub(crate) fn add_occupant(
        &mut self,
        id: EntityId,
        from: Option<&Cell>,
        out: &mut Vec<AoiEvent>,
    ) {
        self.occupants.insert(id);

        let Some(from) = from else {
            out.extend(
                self.observers
                    .iter()
                    .filter(|&&watcher| watcher != id)
                    .map(|&watcher| AoiEvent::enter(watcher, id)),
            );
            return;
        };

        out.extend(
            from.observers
                .iter()
                .filter(|&&watcher| watcher != id && !self.observers.contains(&watcher))
                .map(|&watcher| AoiEvent::leave(watcher, id)),
        );
        out.extend(
            self.observers
                .iter()
                .filter(|&&watcher| watcher != id && !from.observers.contains(&watcher))
                .map(|&watcher| AoiEvent::enter(watcher, id)),
        );
    }

    /// Take `id` out of this cell, telling the observers only if `notify`.
    pub(crate) fn remove_occupant(&mut self, id: EntityId, notify: bool, out: &mut Vec<AoiEvent>) {
        self.occupants.remove(&id);
        if notify {
            out.extend(
                self.observers
                    .iter()
                    .filter(|&&watcher| watcher != id)
                    .map(|&watcher| AoiEvent::leave(watcher, id)),
            );
        }
    }

    /// Start watching this cell; `id` sees every current occupant.
    pub(crate) fn add_observer(
        &mut self,
        id: EntityId,
        out: &mut Vec<AoiEvent>,
    ) -> Result<(), CellError> {
        if !self.observers.insert(id) {
            return Err(CellError::DuplicateObserver {
                entity: id,
                cell: self.coord,
            });
        }
        out.extend(
            self.occupants
                .iter()
                .filter(|&&occupant| occupant != id)
                .map(|&occupant| AoiEvent::enter(id, occupant)),
        );
        Ok(())
    }

    /// Stop watching this cell; `id` loses sight of every remaining occupant.
    pub(crate) fn remove_observer(
        &mut self,
        id: EntityId,
        out: &mut Vec<AoiEvent>,
    ) -> Result<(), CellError> {
        if !self.observers.remove(&id) {
            return Err(CellError::UnknownObserver {
                entity: id,
                cell: self.coord,
            });
        }
        out.extend(
            self.occupants
                .iter()
                .filter(|&&occupant| occupant != id)
                .map(|&occupant| AoiEvent::leave(id, occupant)),
        );
        Ok(())
    }
}
