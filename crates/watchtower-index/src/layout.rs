//! World-to-cell geometry shared by every manager implementation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{GridConfig, GridError, Position};

/// Upper bound on the number of cells a single grid may allocate.
pub const MAX_CELLS: u64 = 1 << 24;

/// Column/row address of one cell.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct CellCoord {
    pub col: u32,
    pub row: u32,
}

impl CellCoord {
    #[must_use]
    pub const fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Inclusive rectangle of cells watched by one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub min_col: u32,
    pub max_col: u32,
    pub min_row: u32,
    pub max_row: u32,
}

impl Footprint {
    /// Footprint covering exactly one cell.
    #[must_use]
    pub const fn single(coord: CellCoord) -> Self {
        Self {
            min_col: coord.col,
            max_col: coord.col,
            min_row: coord.row,
            max_row: coord.row,
        }
    }

    #[must_use]
    pub const fn contains(&self, coord: CellCoord) -> bool {
        coord.col >= self.min_col
            && coord.col <= self.max_col
            && coord.row >= self.min_row
            && coord.row <= self.max_row
    }

    /// Number of cells covered.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        let cols = (self.max_col - self.min_col) as usize + 1;
        let rows = (self.max_row - self.min_row) as usize + 1;
        cols * rows
    }

    /// Every covered cell, column by column.
    pub fn cells(self) -> impl Iterator<Item = CellCoord> {
        (self.min_col..=self.max_col)
            .flat_map(move |col| (self.min_row..=self.max_row).map(move |row| CellCoord { col, row }))
    }

    /// Cells covered by `self` but not by `other`.
    pub fn difference(self, other: Footprint) -> impl Iterator<Item = CellCoord> {
        self.cells().filter(move |coord| !other.contains(*coord))
    }
}

/// Immutable mapping from world coordinates to cell coordinates.
///
/// Positions outside the world bounds are clamped onto the border cells
/// rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellLayout {
    min_x: f32,
    min_y: f32,
    cell_size: f32,
    cols: u32,
    rows: u32,
}

impl CellLayout {
    /// Derive the layout for `config`, validating it first.
    pub fn new(config: &GridConfig) -> Result<Self, GridError> {
        config.validate()?;
        let cols = slots(config.max_x - config.min_x, config.cell_size)?;
        let rows = slots(config.max_y - config.min_y, config.cell_size)?;
        if u64::from(cols) * u64::from(rows) > MAX_CELLS {
            return Err(GridError::InvalidConfig(
                "grid would allocate more than MAX_CELLS cells",
            ));
        }
        Ok(Self {
            min_x: config.min_x,
            min_y: config.min_y,
            cell_size: config.cell_size,
            cols,
            rows,
        })
    }

    #[must_use]
    pub const fn cols(&self) -> u32 {
        self.cols
    }

    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Total number of cells in the grid.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Home cell of `position`.
    #[must_use]
    pub fn cell_of(&self, position: Position) -> CellCoord {
        CellCoord {
            col: clamp_slot(position.x, self.min_x, self.cell_size, self.cols),
            row: clamp_slot(position.y, self.min_y, self.cell_size, self.rows),
        }
    }

    /// Cells intersecting the square of half-width `radius` around `position`.
    ///
    /// Negative or NaN radii watch only the home cell.
    #[must_use]
    pub fn footprint(&self, position: Position, radius: f32) -> Footprint {
        let radius = radius.max(0.0);
        let low = self.cell_of(Position::new(position.x - radius, position.y - radius));
        let high = self.cell_of(Position::new(position.x + radius, position.y + radius));
        Footprint {
            min_col: low.col,
            max_col: high.col,
            min_row: low.row,
            max_row: high.row,
        }
    }

    /// Footprint spanning the whole grid.
    #[must_use]
    pub const fn full(&self) -> Footprint {
        Footprint {
            min_col: 0,
            max_col: self.cols - 1,
            min_row: 0,
            max_row: self.rows - 1,
        }
    }

    /// Dense storage index of `coord` (column-major).
    #[must_use]
    pub const fn index(&self, coord: CellCoord) -> usize {
        coord.col as usize * self.rows as usize + coord.row as usize
    }

    /// Inverse of [`CellLayout::index`].
    #[must_use]
    pub const fn coord_at(&self, index: usize) -> CellCoord {
        CellCoord {
            col: (index / self.rows as usize) as u32,
            row: (index % self.rows as usize) as u32,
        }
    }
}

fn slots(span: f32, cell_size: f32) -> Result<u32, GridError> {
    let whole = (span / cell_size).floor();
    if !whole.is_finite() || whole >= MAX_CELLS as f32 {
        return Err(GridError::InvalidConfig(
            "world span is too large for the configured cell_size",
        ));
    }
    Ok(whole as u32 + 1)
}

fn clamp_slot(value: f32, min: f32, cell_size: f32, slots: u32) -> u32 {
    let slot = ((value - min) / cell_size).floor();
    let last = slots - 1;
    if slot.is_nan() || slot <= 0.0 {
        0
    } else if slot >= last as f32 {
        last
    } else {
        slot as u32
    }
}
