//! The tower grid: orchestrates cells for enter, leave and move.

use std::fmt;

use slotmap::{SecondaryMap, SlotMap};
use tracing::{debug, error, trace};

use crate::entity::EntityRecord;
use crate::{
    AoiEvent, AoiListener, AoiManager, Cell, CellCoord, CellError, CellLayout, Entity, EntityId,
    EventKind, Footprint, GridConfig, GridError, Position,
};

/// Area-of-interest manager backed by a fixed array of cells.
///
/// Every operation costs time proportional to the cells in the affected
/// footprints plus the occupants/observers of those cells, independent of
/// the total population.
pub struct TowerGrid<P, L = Box<dyn AoiListener<P>>> {
    config: GridConfig,
    layout: CellLayout,
    cells: Vec<Cell>,
    entities: SlotMap<EntityId, EntityRecord<P>>,
    listeners: SecondaryMap<EntityId, L>,
    pending: Vec<AoiEvent>,
}

impl<P, L> fmt::Debug for TowerGrid<P, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TowerGrid")
            .field("config", &self.config)
            .field("cols", &self.layout.cols())
            .field("rows", &self.layout.rows())
            .field("entities", &self.entities.len())
            .finish()
    }
}

impl<P, L: AoiListener<P>> TowerGrid<P, L> {
    /// Build a grid for `config`, allocating every cell up front.
    pub fn new(config: GridConfig) -> Result<Self, GridError> {
        let layout = CellLayout::new(&config)?;
        let cells = (0..layout.cell_count())
            .map(|index| Cell::new(layout.coord_at(index)))
            .collect();
        debug!(
            cols = layout.cols(),
            rows = layout.rows(),
            cell_size = layout.cell_size(),
            "tower grid allocated"
        );
        Ok(Self {
            config,
            layout,
            cells,
            entities: SlotMap::with_key(),
            listeners: SecondaryMap::new(),
            pending: Vec::new(),
        })
    }

    /// Shorthand for [`TowerGrid::new`] with explicit bounds.
    pub fn with_bounds(
        min_x: f32,
        max_x: f32,
        min_y: f32,
        max_y: f32,
        cell_size: f32,
    ) -> Result<Self, GridError> {
        Self::new(GridConfig::new(min_x, max_x, min_y, max_y, cell_size))
    }

    /// Register `entity` at `position`.
    ///
    /// The entrant first registers as observer of its footprint (learning
    /// about everyone already there), then as occupant of its home cell
    /// (announcing itself to that cell's observers).
    pub fn enter(&mut self, entity: Entity<P, L>, position: Position) -> Result<EntityId, GridError> {
        let Entity {
            radius,
            payload,
            listener,
        } = entity;
        let home = self.layout.cell_of(position);
        let footprint = self.layout.footprint(position, radius);
        let id = self.entities.insert(EntityRecord {
            position,
            radius,
            payload,
            home,
        });
        self.listeners.insert(id, listener);

        let outcome = self.watch(id, footprint.cells());
        if outcome.is_ok() {
            self.cells[self.layout.index(home)].add_occupant(id, None, &mut self.pending);
            debug!(entity = ?id, x = position.x, y = position.y, %home, "entity entered");
        }
        self.dispatch();
        outcome.map(|()| id)
    }

    /// Deregister `id` and hand its entity back.
    pub fn leave(&mut self, id: EntityId) -> Result<Entity<P, L>, GridError> {
        let (home, footprint) = {
            let record = self.record(id)?;
            (record.home, self.layout.footprint(record.position, record.radius))
        };

        self.cells[self.layout.index(home)].remove_occupant(id, true, &mut self.pending);
        let outcome = self.unwatch(id, footprint.cells());
        self.dispatch();
        outcome?;

        let (Some(record), Some(listener)) = (self.entities.remove(id), self.listeners.remove(id))
        else {
            return Err(GridError::UnknownEntity(id));
        };
        debug!(entity = ?id, %home, "entity left");
        Ok(Entity {
            radius: record.radius,
            payload: record.payload,
            listener,
        })
    }

    /// Relocate `id`, touching only cells whose relationship to it changed.
    pub fn moved(&mut self, id: EntityId, position: Position) -> Result<(), GridError> {
        let record = self
            .entities
            .get_mut(id)
            .ok_or(GridError::UnknownEntity(id))?;
        let old_position = std::mem::replace(&mut record.position, position);
        let radius = record.radius;
        let old_home = record.home;
        let new_home = self.layout.cell_of(position);
        record.home = new_home;

        if old_home != new_home {
            let from = self.layout.index(old_home);
            let to = self.layout.index(new_home);
            self.cells[from].remove_occupant(id, false, &mut self.pending);
            let (target, source) = pair_mut(&mut self.cells, to, from);
            target.add_occupant(id, Some(source), &mut self.pending);
        }

        let old_footprint = self.layout.footprint(old_position, radius);
        let new_footprint = self.layout.footprint(position, radius);
        let outcome = if old_footprint == new_footprint {
            Ok(())
        } else {
            self.unwatch(id, old_footprint.difference(new_footprint))
                .and_then(|()| self.watch(id, new_footprint.difference(old_footprint)))
        };

        trace!(
            entity = ?id,
            %old_home,
            %new_home,
            footprint_changed = old_footprint != new_footprint,
            "entity moved"
        );
        self.dispatch();
        outcome
    }

    fn watch(
        &mut self,
        id: EntityId,
        coords: impl Iterator<Item = CellCoord>,
    ) -> Result<(), GridError> {
        for coord in coords {
            self.cells[self.layout.index(coord)]
                .add_observer(id, &mut self.pending)
                .map_err(invariant_broken)?;
        }
        Ok(())
    }

    fn unwatch(
        &mut self,
        id: EntityId,
        coords: impl Iterator<Item = CellCoord>,
    ) -> Result<(), GridError> {
        for coord in coords {
            self.cells[self.layout.index(coord)]
                .remove_observer(id, &mut self.pending)
                .map_err(invariant_broken)?;
        }
        Ok(())
    }

    /// Deliver buffered events. Subjects are resolved at delivery time, so
    /// listeners see post-operation positions.
    fn dispatch(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut events = std::mem::take(&mut self.pending);
        for event in &events {
            let Some(subject) = self.entities.get(event.subject) else {
                continue;
            };
            let Some(listener) = self.listeners.get_mut(event.observer) else {
                continue;
            };
            let neighbor = subject.neighbor(event.subject);
            match event.kind {
                EventKind::Enter => listener.on_enter(neighbor),
                EventKind::Leave => listener.on_leave(neighbor),
            }
        }
        trace!(events = events.len(), "notifications dispatched");
        events.clear();
        self.pending = events;
    }
}

impl<P, L> TowerGrid<P, L> {
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    #[must_use]
    pub fn layout(&self) -> &CellLayout {
        &self.layout
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Handles of every registered entity.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys()
    }

    #[must_use]
    pub fn position(&self, id: EntityId) -> Option<Position> {
        self.entities.get(id).map(|record| record.position)
    }

    #[must_use]
    pub fn radius(&self, id: EntityId) -> Option<f32> {
        self.entities.get(id).map(|record| record.radius)
    }

    #[must_use]
    pub fn payload(&self, id: EntityId) -> Option<&P> {
        self.entities.get(id).map(|record| &record.payload)
    }

    #[must_use]
    pub fn payload_mut(&mut self, id: EntityId) -> Option<&mut P> {
        self.entities.get_mut(id).map(|record| &mut record.payload)
    }

    #[must_use]
    pub fn listener(&self, id: EntityId) -> Option<&L> {
        self.listeners.get(id)
    }

    #[must_use]
    pub fn listener_mut(&mut self, id: EntityId) -> Option<&mut L> {
        self.listeners.get_mut(id)
    }

    /// Cell currently holding `id` as an occupant.
    #[must_use]
    pub fn home_cell(&self, id: EntityId) -> Option<CellCoord> {
        self.entities.get(id).map(|record| record.home)
    }

    /// Cells currently observed by `id`.
    #[must_use]
    pub fn footprint(&self, id: EntityId) -> Option<Footprint> {
        self.entities
            .get(id)
            .map(|record| self.layout.footprint(record.position, record.radius))
    }

    #[must_use]
    pub fn cell(&self, coord: CellCoord) -> Option<&Cell> {
        if coord.col >= self.layout.cols() || coord.row >= self.layout.rows() {
            return None;
        }
        self.cells.get(self.layout.index(coord))
    }

    /// Every cell, column by column.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.iter()
    }

    /// Entities currently able to see `id`.
    pub fn observers_of(&self, id: EntityId) -> Option<impl Iterator<Item = EntityId> + '_> {
        let home = self.entities.get(id)?.home;
        let cell = &self.cells[self.layout.index(home)];
        Some(cell.observers().filter(move |&watcher| watcher != id))
    }

    /// Entities currently visible to `id`.
    pub fn visible_from(&self, id: EntityId) -> Option<impl Iterator<Item = EntityId> + '_> {
        let footprint = self.footprint(id)?;
        Some(
            footprint
                .cells()
                .flat_map(move |coord| self.cells[self.layout.index(coord)].occupants())
                .filter(move |&occupant| occupant != id),
        )
    }

    /// Re-derive every entity's home cell and footprint and confirm the cell
    /// sets match them exactly.
    pub fn check_consistency(&self) -> Result<(), GridError> {
        for (id, record) in &self.entities {
            let home = &self.cells[self.layout.index(record.home)];
            if record.home != self.layout.cell_of(record.position) {
                return Err(desync(home.coord(), id, "home link disagrees with position"));
            }
            if !home.has_occupant(id) {
                return Err(desync(home.coord(), id, "entity missing from its home cell"));
            }
            let footprint = self.layout.footprint(record.position, record.radius);
            for coord in footprint.cells() {
                if !self.cells[self.layout.index(coord)].has_observer(id) {
                    return Err(desync(coord, id, "entity missing from a watched cell"));
                }
            }
        }
        for cell in &self.cells {
            for occupant in cell.occupants() {
                match self.entities.get(occupant) {
                    Some(record) if record.home == cell.coord() => {}
                    _ => return Err(desync(cell.coord(), occupant, "stray occupant")),
                }
            }
            for watcher in cell.observers() {
                match self.entities.get(watcher) {
                    Some(record)
                        if self
                            .layout
                            .footprint(record.position, record.radius)
                            .contains(cell.coord()) => {}
                    _ => return Err(desync(cell.coord(), watcher, "stray observer")),
                }
            }
        }
        Ok(())
    }

    fn record(&self, id: EntityId) -> Result<&EntityRecord<P>, GridError> {
        self.entities.get(id).ok_or(GridError::UnknownEntity(id))
    }
}

impl<P, L: AoiListener<P>> AoiManager<P, L> for TowerGrid<P, L> {
    fn enter(&mut self, entity: Entity<P, L>, position: Position) -> Result<EntityId, GridError> {
        TowerGrid::enter(self, entity, position)
    }

    fn leave(&mut self, id: EntityId) -> Result<Entity<P, L>, GridError> {
        TowerGrid::leave(self, id)
    }

    fn moved(&mut self, id: EntityId, position: Position) -> Result<(), GridError> {
        TowerGrid::moved(self, id, position)
    }

    fn listener(&self, id: EntityId) -> Option<&L> {
        TowerGrid::listener(self, id)
    }

    fn len(&self) -> usize {
        TowerGrid::len(self)
    }
}

fn invariant_broken(err: CellError) -> GridError {
    error!(%err, "observer bookkeeping out of sync with footprints");
    err.into()
}

fn desync(cell: CellCoord, entity: EntityId, reason: &'static str) -> GridError {
    GridError::Desynchronized {
        cell,
        entity,
        reason,
    }
}

/// Mutable `target` and shared `source` from the same slice.
fn pair_mut(cells: &mut [Cell], target: usize, source: usize) -> (&mut Cell, &Cell) {
    debug_assert_ne!(target, source);
    if target < source {
        let (low, high) = cells.split_at_mut(source);
        (&mut low[target], &high[0])
    } else {
        let (low, high) = cells.split_at_mut(target);
        (&mut high[0], &low[source])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventLog;

    type LogGrid = TowerGrid<&'static str, EventLog>;

    fn grid() -> LogGrid {
        TowerGrid::with_bounds(0.0, 100.0, 0.0, 100.0, 10.0).expect("grid")
    }

    fn spawn(grid: &mut LogGrid, name: &'static str, radius: f32, x: f32, y: f32) -> EntityId {
        grid.enter(Entity::new(radius, name, EventLog::new()), Position::new(x, y))
            .expect("enter")
    }

    fn log(grid: &LogGrid, id: EntityId) -> &EventLog {
        grid.listener(id).expect("listener")
    }

    #[test]
    fn entering_next_to_a_watcher_notifies_both_sides() {
        let mut grid = grid();
        let a = spawn(&mut grid, "a", 10.0, 15.0, 15.0);
        let b = spawn(&mut grid, "b", 10.0, 22.0, 15.0);

        assert_eq!(log(&grid, a).entries(), &[(EventKind::Enter, b)]);
        assert_eq!(log(&grid, b).entries(), &[(EventKind::Enter, a)]);
        assert_eq!(grid.home_cell(b), Some(CellCoord::new(2, 1)));
        grid.check_consistency().expect("consistent");
    }

    #[test]
    fn leave_notifies_and_returns_the_entity() {
        let mut grid = grid();
        let a = spawn(&mut grid, "a", 10.0, 15.0, 15.0);
        let b = spawn(&mut grid, "b", 10.0, 22.0, 15.0);

        let entity = grid.leave(b).expect("leave");
        assert_eq!(entity.payload, "b");
        assert_eq!(entity.radius, 10.0);
        assert_eq!(
            entity.listener.entries(),
            &[(EventKind::Enter, a), (EventKind::Leave, a)]
        );
        assert_eq!(log(&grid, a).count(EventKind::Leave, b), 1);
        assert!(!grid.contains(b));
        assert!(grid.cells().all(|cell| !cell.has_observer(b) && !cell.has_occupant(b)));
        assert_eq!(grid.leave(b).map(|_| ()), Err(GridError::UnknownEntity(b)));
        assert_eq!(
            grid.moved(b, Position::new(1.0, 1.0)),
            Err(GridError::UnknownEntity(b))
        );
        grid.check_consistency().expect("consistent");
    }

    #[test]
    fn small_moves_inside_the_same_cells_are_silent() {
        let mut grid = grid();
        let a = spawn(&mut grid, "a", 4.0, 55.0, 55.0);
        let b = spawn(&mut grid, "b", 4.0, 52.0, 57.0);
        let before_a = log(&grid, a).len();
        let before_b = log(&grid, b).len();

        grid.moved(a, Position::new(54.0, 54.5)).expect("move");
        grid.moved(b, Position::new(51.0, 58.0)).expect("move");

        assert_eq!(log(&grid, a).len(), before_a);
        assert_eq!(log(&grid, b).len(), before_b);
        assert_eq!(grid.position(a), Some(Position::new(54.0, 54.5)));
    }

    #[test]
    fn moving_into_view_and_back_out() {
        let mut grid = grid();
        let a = spawn(&mut grid, "a", 5.0, 5.0, 5.0);
        let b = spawn(&mut grid, "b", 5.0, 75.0, 5.0);
        assert!(log(&grid, a).is_empty());

        grid.moved(b, Position::new(12.0, 5.0)).expect("approach");
        assert_eq!(log(&grid, a).entries(), &[(EventKind::Enter, b)]);
        assert_eq!(log(&grid, b).entries(), &[(EventKind::Enter, a)]);

        grid.moved(b, Position::new(75.0, 5.0)).expect("retreat");
        assert_eq!(log(&grid, a).count(EventKind::Leave, b), 1);
        assert_eq!(log(&grid, b).count(EventKind::Leave, a), 1);
        grid.check_consistency().expect("consistent");
    }

    #[test]
    fn observers_and_visible_sets_follow_footprints() {
        let mut grid = grid();
        let big = spawn(&mut grid, "big", 25.0, 50.0, 50.0);
        let small = spawn(&mut grid, "small", 0.5, 65.0, 55.0);

        let watchers: Vec<_> = grid.observers_of(small).expect("registered").collect();
        assert_eq!(watchers, vec![big]);
        let seen: Vec<_> = grid.visible_from(big).expect("registered").collect();
        assert_eq!(seen, vec![small]);
        assert_eq!(grid.visible_from(small).expect("registered").count(), 0);
    }

    #[test]
    fn consistency_check_reports_a_missing_occupant() {
        let mut grid = grid();
        let a = spawn(&mut grid, "a", 10.0, 15.0, 15.0);
        grid.check_consistency().expect("consistent");

        let home = grid.layout.index(CellCoord::new(1, 1));
        grid.cells[home].remove_occupant(a, false, &mut grid.pending);
        assert_eq!(
            grid.check_consistency(),
            Err(GridError::Desynchronized {
                cell: CellCoord::new(1, 1),
                entity: a,
                reason: "entity missing from its home cell",
            })
        );
    }

    #[test]
    fn consistency_check_reports_a_stray_observer() {
        let mut grid = grid();
        let a = spawn(&mut grid, "a", 1.0, 15.0, 15.0);
        let far = grid.layout.index(CellCoord::new(9, 9));
        grid.cells[far]
            .add_observer(a, &mut grid.pending)
            .expect("not yet observing");
        assert!(matches!(
            grid.check_consistency(),
            Err(GridError::Desynchronized { entity, reason: "stray observer", .. }) if entity == a
        ));
    }

    #[test]
    fn out_of_range_cell_lookup_is_none() {
        let grid = grid();
        assert!(grid.cell(CellCoord::new(10, 10)).is_some());
        assert!(grid.cell(CellCoord::new(11, 0)).is_none());
    }

    #[test]
    fn boxed_listeners_are_the_default() {
        let mut grid: TowerGrid<u32> =
            TowerGrid::with_bounds(0.0, 10.0, 0.0, 10.0, 1.0).expect("grid");
        let listener: Box<dyn AoiListener<u32>> = Box::new(());
        let id = grid
            .enter(Entity::new(1.0, 9, listener), Position::new(3.0, 3.0))
            .expect("enter");
        assert_eq!(grid.payload(id), Some(&9));
        *grid.payload_mut(id).expect("payload") = 10;
        assert_eq!(grid.leave(id).expect("leave").payload, 10);
    }
}
