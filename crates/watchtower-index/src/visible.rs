//! Per-entity cache of currently visible neighbors.

use std::collections::HashSet;

use tracing::warn;

use crate::{AoiListener, EntityId, Neighbor};

/// Set of entity handles with unique membership.
///
/// Used as a listener it mirrors exactly what its owner can currently see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    members: HashSet<EntityId>,
}

impl VisibleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `id`, returning false if it was already present.
    pub fn add(&mut self, id: EntityId) -> bool {
        self.members.insert(id)
    }

    /// Remove `id`, returning false if it was absent.
    pub fn remove(&mut self, id: EntityId) -> bool {
        self.members.remove(&id)
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.iter().copied()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }
}

impl FromIterator<EntityId> for VisibleSet {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

impl<P> AoiListener<P> for VisibleSet {
    fn on_enter(&mut self, other: Neighbor<'_, P>) {
        if !self.add(other.id) {
            warn!(entity = ?other.id, "enter notification for an entity already visible");
        }
    }

    fn on_leave(&mut self, other: Neighbor<'_, P>) {
        if !self.remove(other.id) {
            warn!(entity = ?other.id, "leave notification for an entity that was not visible");
        }
    }
}
