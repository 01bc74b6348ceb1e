//! Tile storage
//!
//! - [`TileMatrix`]: the M×M grid of N×N tiles holding A (and later its factors)
//! - [`TileVector`]: the right-hand side split into M blocks of N values
//! - [`PivotTable`]: the tile-local row exchanges of each diagonal tile

mod matrix;
mod pivots;
mod vector;

pub use matrix::TileMatrix;
pub use pivots::PivotTable;
pub use vector::TileVector;

pub(crate) use matrix::validate_grid;

/// Position of a tile in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    /// Block row
    pub row: usize,
    /// Block column
    pub col: usize,
}

impl TileIndex {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Offset of the first value of this tile in a grid arena.
    #[inline]
    pub fn offset(&self, tiles: usize, tile_size: usize) -> usize {
        (self.row * tiles + self.col) * tile_size * tile_size
    }
}

impl std::fmt::Display for TileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
