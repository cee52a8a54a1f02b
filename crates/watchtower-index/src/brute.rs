//! Exhaustive reference manager.
//!
//! Shares the cell mapping of [`TowerGrid`](crate::TowerGrid) but keeps no
//! per-cell state: every operation rescans all registered entities and emits
//! the difference in visibility. O(n) per call; meant as a test oracle and a
//! benchmark baseline.

use std::collections::HashSet;
use std::fmt;

use slotmap::{SecondaryMap, SlotMap};

use crate::entity::EntityRecord;
use crate::{
    AoiEvent, AoiListener, AoiManager, CellLayout, Entity, EntityId, EventKind, GridConfig,
    GridError, Position,
};

pub struct BruteForceAoi<P, L = Box<dyn AoiListener<P>>> {
    layout: CellLayout,
    entities: SlotMap<EntityId, EntityRecord<P>>,
    listeners: SecondaryMap<EntityId, L>,
    pending: Vec<AoiEvent>,
}

impl<P, L> fmt::Debug for BruteForceAoi<P, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BruteForceAoi")
            .field("layout", &self.layout)
            .field("entities", &self.entities.len())
            .finish()
    }
}

impl<P, L: AoiListener<P>> BruteForceAoi<P, L> {
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        Ok(Self {
            layout: CellLayout::new(&config)?,
            entities: SlotMap::with_key(),
            listeners: SecondaryMap::new(),
            pending: Vec::new(),
        })
    }

    /// Does `observer` currently see `subject`?
    fn sees(&self, observer: EntityId, subject: EntityId) -> bool {
        if observer == subject {
            return false;
        }
        match (self.entities.get(observer), self.entities.get(subject)) {
            (Some(watcher), Some(target)) => self
                .layout
                .footprint(watcher.position, watcher.radius)
                .contains(target.home),
            _ => false,
        }
    }

    /// (entities `id` sees, entities that see `id`)
    fn relations(&self, id: EntityId) -> (HashSet<EntityId>, HashSet<EntityId>) {
        let mut seen = HashSet::new();
        let mut watchers = HashSet::new();
        for other in self.entities.keys() {
            if self.sees(id, other) {
                seen.insert(other);
            }
            if self.sees(other, id) {
                watchers.insert(other);
            }
        }
        (seen, watchers)
    }

    fn emit_diff(
        &mut self,
        id: EntityId,
        before: (HashSet<EntityId>, HashSet<EntityId>),
        after: (HashSet<EntityId>, HashSet<EntityId>),
    ) {
        let (seen_before, watchers_before) = before;
        let (seen_after, watchers_after) = after;
        for &gone in seen_before.difference(&seen_after) {
            self.pending.push(AoiEvent::leave(id, gone));
        }
        for &watcher in watchers_before.difference(&watchers_after) {
            self.pending.push(AoiEvent::leave(watcher, id));
        }
        for &added in seen_after.difference(&seen_before) {
            self.pending.push(AoiEvent::enter(id, added));
        }
        for &watcher in watchers_after.difference(&watchers_before) {
            self.pending.push(AoiEvent::enter(watcher, id));
        }
    }

    fn dispatch(&mut self) {
        for event in self.pending.drain(..) {
            let (Some(subject), Some(listener)) = (
                self.entities.get(event.subject),
                self.listeners.get_mut(event.observer),
            ) else {
                continue;
            };
            let neighbor = subject.neighbor(event.subject);
            match event.kind {
                EventKind::Enter => listener.on_enter(neighbor),
                EventKind::Leave => listener.on_leave(neighbor),
            }
        }
    }

    fn empty_relations() -> (HashSet<EntityId>, HashSet<EntityId>) {
        (HashSet::new(), HashSet::new())
    }
}

impl<P, L: AoiListener<P>> AoiManager<P, L> for BruteForceAoi<P, L> {
    fn enter(&mut self, entity: Entity<P, L>, position: Position) -> Result<EntityId, GridError> {
        let id = self.entities.insert(EntityRecord {
            position,
            radius: entity.radius,
            payload: entity.payload,
            home: self.layout.cell_of(position),
        });
        self.listeners.insert(id, entity.listener);
        let after = self.relations(id);
        self.emit_diff(id, Self::empty_relations(), after);
        self.dispatch();
        Ok(id)
    }

    fn leave(&mut self, id: EntityId) -> Result<Entity<P, L>, GridError> {
        if !self.entities.contains_key(id) {
            return Err(GridError::UnknownEntity(id));
        }
        let before = self.relations(id);
        self.emit_diff(id, before, Self::empty_relations());
        self.dispatch();
        let (Some(record), Some(listener)) = (self.entities.remove(id), self.listeners.remove(id))
        else {
            return Err(GridError::UnknownEntity(id));
        };
        Ok(Entity {
            radius: record.radius,
            payload: record.payload,
            listener,
        })
    }

    fn moved(&mut self, id: EntityId, position: Position) -> Result<(), GridError> {
        if !self.entities.contains_key(id) {
            return Err(GridError::UnknownEntity(id));
        }
        let before = self.relations(id);
        let home = self.layout.cell_of(position);
        if let Some(record) = self.entities.get_mut(id) {
            record.position = position;
            record.home = home;
        }
        let after = self.relations(id);
        self.emit_diff(id, before, after);
        self.dispatch();
        Ok(())
    }

    fn listener(&self, id: EntityId) -> Option<&L> {
        self.listeners.get(id)
    }

    fn len(&self) -> usize {
        self.entities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventLog;

    #[test]
    fn oracle_reports_pairwise_visibility() {
        let mut oracle: BruteForceAoi<(), EventLog> =
            BruteForceAoi::new(GridConfig::new(0.0, 100.0, 0.0, 100.0, 10.0)).expect("oracle");
        let a = oracle
            .enter(Entity::new(12.0, (), EventLog::new()), Position::new(5.0, 5.0))
            .expect("enter a");
        let b = oracle
            .enter(Entity::new(5.0, (), EventLog::new()), Position::new(25.0, 5.0))
            .expect("enter b");
        assert!(oracle.listener(a).expect("a").is_empty());

        oracle.moved(a, Position::new(15.0, 5.0)).expect("move a");
        let log = oracle.listener(a).expect("a");
        assert_eq!(log.entries(), &[(EventKind::Enter, b)]);
        assert!(oracle.listener(b).expect("b").is_empty());

        let returned = oracle.leave(a).expect("leave a");
        assert_eq!(returned.listener.count(EventKind::Leave, b), 1);
        assert_eq!(AoiManager::len(&oracle), 1);
    }
}
