//! Registration of tiles, pivots and right-hand-side blocks with the runtime

use crate::error::{Result, TiledLuError};
use crate::runtime::{BufferHandle, BufferShape, Runtime};
use crate::tile::{PivotTable, TileMatrix, TileVector};
use crate::traits::Scalar;

/// Runtime handles of every tile and pivot list of a grid.
#[derive(Debug, Clone)]
pub struct MatrixHandles {
    tiles: usize,
    tile_size: usize,
    tile: Vec<BufferHandle>,
    pivots: Vec<BufferHandle>,
}

impl MatrixHandles {
    /// Register a grid and its pivot table for in-place factorization.
    pub fn register<'a, T: Scalar>(
        runtime: &mut Runtime<'a, T>,
        matrix: &'a mut TileMatrix<T>,
        pivots: &'a mut PivotTable,
    ) -> Result<Self> {
        check_pivots(matrix, pivots)?;
        let (tiles, n) = (matrix.tiles(), matrix.tile_size());
        let shape = BufferShape::Matrix { rows: n, cols: n };

        let tile = matrix
            .tiles_mut()
            .map(|(_, values)| runtime.register_values(values, shape))
            .collect::<Result<Vec<_>>>()?;
        let pivots = pivots
            .levels_mut()
            .map(|level| runtime.register_pivots(level))
            .collect();

        Ok(Self {
            tiles,
            tile_size: n,
            tile,
            pivots,
        })
    }

    /// Register factored tiles and pivots for read-only use by substitutions.
    pub fn register_shared<'a, T: Scalar>(
        runtime: &mut Runtime<'a, T>,
        matrix: &'a TileMatrix<T>,
        pivots: &'a PivotTable,
    ) -> Result<Self> {
        check_pivots(matrix, pivots)?;
        let (tiles, n) = (matrix.tiles(), matrix.tile_size());
        let shape = BufferShape::Matrix { rows: n, cols: n };

        let tile = matrix
            .tiles_iter()
            .map(|values| runtime.register_shared(values, shape))
            .collect::<Result<Vec<_>>>()?;
        let pivots = pivots
            .levels()
            .map(|level| runtime.register_shared_pivots(level))
            .collect();

        Ok(Self {
            tiles,
            tile_size: n,
            tile,
            pivots,
        })
    }

    pub fn tiles(&self) -> usize {
        self.tiles
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Handle of tile `(row, col)`; indices must lie inside the grid.
    pub fn tile(&self, row: usize, col: usize) -> BufferHandle {
        self.tile[row * self.tiles + col]
    }

    /// Handle of the pivot list of diagonal tile `(level, level)`.
    pub fn pivots(&self, level: usize) -> BufferHandle {
        self.pivots[level]
    }
}

/// Register every block of a right-hand side, in order.
pub fn register_vector<'a, T: Scalar>(
    runtime: &mut Runtime<'a, T>,
    vector: &'a mut TileVector<T>,
) -> Result<Vec<BufferHandle>> {
    let len = vector.block_size();
    vector
        .blocks_mut()
        .map(|block| runtime.register_values(block, BufferShape::Vector { len }))
        .collect()
}

fn check_pivots<T: Scalar>(matrix: &TileMatrix<T>, pivots: &PivotTable) -> Result<()> {
    if pivots.tiles() != matrix.tiles() {
        return Err(TiledLuError::dimension(
            "pivot table levels",
            matrix.tiles(),
            pivots.tiles(),
        ));
    }
    if pivots.tile_size() != matrix.tile_size() {
        return Err(TiledLuError::dimension(
            "pivot list length",
            matrix.tile_size(),
            pivots.tile_size(),
        ));
    }
    Ok(())
}
