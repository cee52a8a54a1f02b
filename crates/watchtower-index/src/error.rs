//! Errors raised by cells and managers.

use thiserror::Error;

use crate::{CellCoord, EntityId};

/// Bookkeeping violations detected by a single cell.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CellError {
    /// The entity was registered as an observer of a cell it already watches.
    #[error("entity {entity:?} already observes cell {cell}")]
    DuplicateObserver { entity: EntityId, cell: CellCoord },
    /// The entity was removed from a cell it never watched.
    #[error("entity {entity:?} does not observe cell {cell}")]
    UnknownObserver { entity: EntityId, cell: CellCoord },
}

/// Errors emitted by area-of-interest managers.
///
/// Everything except [`GridError::InvalidConfig`] means the manager's
/// internal sets no longer agree with the entities' footprints. Callers
/// should treat those as unrecoverable and stop using the manager.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum GridError {
    /// Configuration values that cannot describe a grid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// The id is stale or was never issued by this manager.
    #[error("entity {0:?} is not registered")]
    UnknownEntity(EntityId),
    /// See [`CellError::DuplicateObserver`].
    #[error("entity {entity:?} already observes cell {cell}")]
    DuplicateObserver { entity: EntityId, cell: CellCoord },
    /// See [`CellError::UnknownObserver`].
    #[error("entity {entity:?} does not observe cell {cell}")]
    UnknownObserver { entity: EntityId, cell: CellCoord },
    /// A consistency audit found a cell whose membership disagrees with the
    /// registered entities.
    #[error("cell {cell} is out of sync: {reason}")]
    Desynchronized {
        cell: CellCoord,
        entity: EntityId,
        reason: &'static str,
    },
}

impl From<CellError> for GridError {
    fn from(err: CellError) -> Self {
        match err {
            CellError::DuplicateObserver { entity, cell } => {
                GridError::DuplicateObserver { entity, cell }
            }
            CellError::UnknownObserver { entity, cell } => {
                GridError::UnknownObserver { entity, cell }
            }
        }
    }
}
