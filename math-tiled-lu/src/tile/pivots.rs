//! Tile-local pivot lists of the diagonal tiles

use super::validate_grid;
use crate::error::{Result, TiledLuError};

/// Row exchanges recorded while factoring each diagonal tile.
///
/// Uses the LAPACK convention: at step `i` of diagonal tile `l`, row `i` was
/// exchanged with row `pivots(l)[i]` (both local to the tile). Before
/// factorization every list is the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotTable {
    data: Vec<usize>,
    tiles: usize,
    tile_size: usize,
}

impl PivotTable {
    pub fn identity(tiles: usize, tile_size: usize) -> Result<Self> {
        validate_grid(tiles, tile_size)?;
        let data = (0..tiles).flat_map(|_| 0..tile_size).collect();
        Ok(Self {
            data,
            tiles,
            tile_size,
        })
    }

    pub fn tiles(&self) -> usize {
        self.tiles
    }

    /// Pivot list of diagonal tile `(level, level)`.
    pub fn pivots(&self, level: usize) -> Result<&[usize]> {
        if level >= self.tiles {
            return Err(TiledLuError::TileOutOfBounds {
                row: level,
                col: level,
                tiles: self.tiles,
            });
        }
        Ok(&self.data[level * self.tile_size..(level + 1) * self.tile_size])
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Pivot lists, one per level.
    pub(crate) fn levels(&self) -> impl Iterator<Item = &[usize]> {
        self.data.chunks_exact(self.tile_size)
    }

    /// Disjoint mutable pivot lists, one per level.
    pub(crate) fn levels_mut(&mut self) -> impl Iterator<Item = &mut [usize]> {
        self.data.chunks_exact_mut(self.tile_size)
    }

    /// Row permutation of the whole matrix implied by all tile-local exchanges.
    ///
    /// Row `i` of `P·A` is row `permutation[i]` of `A`.
    pub fn row_permutation(&self) -> Vec<usize> {
        let n = self.tile_size;
        let mut permutation: Vec<usize> = (0..self.tiles * n).collect();
        for (level, pivots) in self.data.chunks_exact(n).enumerate() {
            let base = level * n;
            for (i, &p) in pivots.iter().enumerate() {
                permutation.swap(base + i, base + p);
            }
        }
        permutation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_permutation() {
        let table = PivotTable::identity(2, 3).unwrap();
        assert_eq!(table.pivots(1).unwrap(), &[0, 1, 2]);
        assert_eq!(table.row_permutation(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_exchanges_stay_inside_tile() {
        let mut table = PivotTable::identity(2, 2).unwrap();
        for pivots in table.levels_mut() {
            pivots[0] = 1;
        }
        assert_eq!(table.row_permutation(), vec![1, 0, 3, 2]);
        assert!(table.pivots(2).is_err());
    }
}
