//! Square grid of dense square tiles stored in one arena

use super::{TileIndex, TileVector};
use crate::error::{Result, TiledLuError};
use crate::traits::Scalar;
use ndarray::{Array2, ArrayView2, ArrayViewMut2};

/// An M×M grid of N×N row-major tiles.
///
/// All tiles live in a single contiguous buffer; tile `(r, c)` starts at
/// offset `(r * M + c) * N * N`. The grid never changes shape after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMatrix<T: Scalar> {
    data: Vec<T>,
    tiles: usize,
    tile_size: usize,
}

impl<T: Scalar> TileMatrix<T> {
    /// Create a grid of `tiles`×`tiles` zero tiles of size `tile_size`.
    pub fn zeros(tiles: usize, tile_size: usize) -> Result<Self> {
        validate_grid(tiles, tile_size)?;
        Ok(Self {
            data: vec![T::zero(); tiles * tiles * tile_size * tile_size],
            tiles,
            tile_size,
        })
    }

    /// Split a dense square matrix into tiles of size `tile_size`.
    ///
    /// The matrix order must be a positive multiple of `tile_size`.
    pub fn from_dense(a: &Array2<T>, tile_size: usize) -> Result<Self> {
        let order = a.nrows();
        if a.ncols() != order {
            return Err(TiledLuError::dimension("square matrix columns", order, a.ncols()));
        }
        if tile_size == 0 {
            return Err(TiledLuError::dimension("tile size", 1, 0));
        }
        if order == 0 || order % tile_size != 0 {
            return Err(TiledLuError::dimension(
                "matrix order (multiple of tile size)",
                order.div_ceil(tile_size).max(1) * tile_size,
                order,
            ));
        }

        let mut matrix = Self::zeros(order / tile_size, tile_size)?;
        for r in 0..matrix.tiles {
            for c in 0..matrix.tiles {
                let block = a.slice(ndarray::s![
                    r * tile_size..(r + 1) * tile_size,
                    c * tile_size..(c + 1) * tile_size
                ]);
                matrix.tile_view_mut(r, c)?.assign(&block);
            }
        }
        Ok(matrix)
    }

    /// Assemble the tiles back into a dense matrix.
    pub fn to_dense(&self) -> Array2<T> {
        let n = self.tile_size;
        Array2::from_shape_fn((self.order(), self.order()), |(i, j)| {
            let offset = TileIndex::new(i / n, j / n).offset(self.tiles, n);
            self.data[offset + (i % n) * n + j % n]
        })
    }

    /// Number of tiles along each grid dimension (M)
    pub fn tiles(&self) -> usize {
        self.tiles
    }

    /// Order of each square tile (N)
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Order of the full matrix (M·N)
    pub fn order(&self) -> usize {
        self.tiles * self.tile_size
    }

    /// Row-major values of tile `(row, col)`.
    pub fn tile(&self, row: usize, col: usize) -> Result<&[T]> {
        let range = self.tile_range(row, col)?;
        Ok(&self.data[range])
    }

    /// Mutable row-major values of tile `(row, col)`.
    pub fn tile_mut(&mut self, row: usize, col: usize) -> Result<&mut [T]> {
        let range = self.tile_range(row, col)?;
        Ok(&mut self.data[range])
    }

    /// Tile `(row, col)` as a 2-D view.
    pub fn tile_view(&self, row: usize, col: usize) -> Result<ArrayView2<'_, T>> {
        let n = self.tile_size;
        let values = self.tile(row, col)?;
        ArrayView2::from_shape((n, n), values)
            .map_err(|_| TiledLuError::dimension("tile values", n * n, values.len()))
    }

    /// Tile `(row, col)` as a mutable 2-D view.
    pub fn tile_view_mut(&mut self, row: usize, col: usize) -> Result<ArrayViewMut2<'_, T>> {
        let n = self.tile_size;
        let values = self.tile_mut(row, col)?;
        let len = values.len();
        ArrayViewMut2::from_shape((n, n), values)
            .map_err(|_| TiledLuError::dimension("tile values", n * n, len))
    }

    /// Disjoint mutable slices of every tile, in grid order.
    pub(crate) fn tiles_mut(&mut self) -> impl Iterator<Item = (TileIndex, &mut [T])> {
        let tiles = self.tiles;
        self.data
            .chunks_exact_mut(self.tile_size * self.tile_size)
            .enumerate()
            .map(move |(k, tile)| (TileIndex::new(k / tiles, k % tiles), tile))
    }

    /// Every tile, in grid order.
    pub(crate) fn tiles_iter(&self) -> impl Iterator<Item = &[T]> {
        self.data.chunks_exact(self.tile_size * self.tile_size)
    }

    /// Compute `A·x` tile by tile.
    pub fn matvec(&self, x: &TileVector<T>) -> Result<TileVector<T>> {
        if x.blocks() != self.tiles || x.block_size() != self.tile_size {
            return Err(TiledLuError::dimension("vector length", self.order(), x.len()));
        }

        let mut y = TileVector::zeros(self.tiles, self.tile_size)?;
        for m in 0..self.tiles {
            let mut acc = ndarray::Array1::from_elem(self.tile_size, T::zero());
            for n in 0..self.tiles {
                acc += &self.tile_view(m, n)?.dot(&x.block_view(n)?);
            }
            y.block_view_mut(m)?.assign(&acc);
        }
        Ok(y)
    }

    fn tile_range(&self, row: usize, col: usize) -> Result<std::ops::Range<usize>> {
        if row >= self.tiles || col >= self.tiles {
            return Err(TiledLuError::TileOutOfBounds {
                row,
                col,
                tiles: self.tiles,
            });
        }
        let start = TileIndex::new(row, col).offset(self.tiles, self.tile_size);
        Ok(start..start + self.tile_size * self.tile_size)
    }
}

/// Largest arena (in values) any scalar type can address
const MAX_ARENA_LEN: usize = isize::MAX as usize / 16;

pub(crate) fn validate_grid(tiles: usize, tile_size: usize) -> Result<()> {
    if tiles == 0 {
        return Err(TiledLuError::dimension("tile count", 1, 0));
    }
    if tile_size == 0 {
        return Err(TiledLuError::dimension("tile size", 1, 0));
    }
    let order = tiles.checked_mul(tile_size);
    let arena = order.and_then(|order| order.checked_mul(order));
    if !arena.is_some_and(|len| len <= MAX_ARENA_LEN) {
        return Err(TiledLuError::dimension(
            "matrix order (tiles x tile size)",
            MAX_ARENA_LEN.isqrt(),
            order.unwrap_or(usize::MAX),
        ));
    }
    Ok(())
}
