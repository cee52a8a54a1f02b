//! Notification capability supplied with every entity.

use crate::{EntityId, EventKind, Position};

/// Read-only view of the entity a notification is about.
#[derive(Debug)]
pub struct Neighbor<'a, P> {
    pub id: EntityId,
    pub position: Position,
    pub radius: f32,
    pub payload: &'a P,
}

impl<P> Clone for Neighbor<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for Neighbor<'_, P> {}

impl<P> Neighbor<'_, P> {
    /// Squared distance from `from` to this neighbor, for listeners that
    /// want a circular cutoff on top of the cell footprint.
    #[must_use]
    pub fn distance_squared(&self, from: Position) -> f32 {
        self.position.distance_squared(from)
    }
}

/// Receives visibility changes for one entity.
///
/// Calls arrive synchronously while the manager is mutably borrowed, so a
/// listener cannot call back into the manager; record what you need and act
/// after the operation returns.
pub trait AoiListener<P> {
    /// `other` became visible.
    fn on_enter(&mut self, other: Neighbor<'_, P>);

    /// `other` stopped being visible.
    fn on_leave(&mut self, other: Neighbor<'_, P>);
}

impl<P> AoiListener<P> for () {
    fn on_enter(&mut self, _other: Neighbor<'_, P>) {}

    fn on_leave(&mut self, _other: Neighbor<'_, P>) {}
}

impl<P, T: AoiListener<P> + ?Sized> AoiListener<P> for Box<T> {
    fn on_enter(&mut self, other: Neighbor<'_, P>) {
        (**self).on_enter(other);
    }

    fn on_leave(&mut self, other: Neighbor<'_, P>) {
        (**self).on_leave(other);
    }
}

/// Listener that records every notification in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    entries: Vec<(EventKind, EntityId)>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded notifications, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[(EventKind, EntityId)] {
        &self.entries
    }

    /// Number of `kind` notifications about `id`.
    #[must_use]
    pub fn count(&self, kind: EventKind, id: EntityId) -> usize {
        self.entries
            .iter()
            .filter(|&&(k, other)| k == kind && other == id)
            .count()
    }

    /// Number of enter notifications about any entity.
    #[must_use]
    pub fn enters(&self) -> usize {
        self.entries
            .iter()
            .filter(|(kind, _)| *kind == EventKind::Enter)
            .count()
    }

    /// Number of leave notifications about any entity.
    #[must_use]
    pub fn leaves(&self) -> usize {
        self.entries
            .iter()
            .filter(|(kind, _)| *kind == EventKind::Leave)
            .count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<P> AoiListener<P> for EventLog {
    fn on_enter(&mut self, other: Neighbor<'_, P>) {
        self.entries.push((EventKind::Enter, other.id));
    }

    fn on_leave(&mut self, other: Neighbor<'_, P>) {
        self.entries.push((EventKind::Leave, other.id));
    }
}
