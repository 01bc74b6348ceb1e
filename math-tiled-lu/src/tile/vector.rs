//! Right-hand side split into tile-sized blocks

use super::validate_grid;
use crate::error::{Result, TiledLuError};
use crate::traits::Scalar;
use ndarray::{Array1, ArrayView1, ArrayViewMut1};

/// A column vector of M blocks with N values each, stored contiguously.
#[derive(Debug, Clone, PartialEq)]
pub struct TileVector<T: Scalar> {
    data: Vec<T>,
    blocks: usize,
    block_size: usize,
}

impl<T: Scalar> TileVector<T> {
    /// Create a zero vector of `blocks` blocks of `block_size` values.
    pub fn zeros(blocks: usize, block_size: usize) -> Result<Self> {
        validate_grid(blocks, block_size)?;
        Ok(Self {
            data: vec![T::zero(); blocks * block_size],
            blocks,
            block_size,
        })
    }

    /// Split `values` into blocks of `block_size`.
    pub fn from_slice(values: &[T], block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(TiledLuError::dimension("block size", 1, 0));
        }
        if values.is_empty() || values.len() % block_size != 0 {
            return Err(TiledLuError::dimension(
                "vector length (multiple of block size)",
                values.len().div_ceil(block_size).max(1) * block_size,
                values.len(),
            ));
        }
        Ok(Self {
            data: values.to_vec(),
            blocks: values.len() / block_size,
            block_size,
        })
    }

    /// Split an `ndarray` vector into blocks of `block_size`.
    pub fn from_array(values: &Array1<T>, block_size: usize) -> Result<Self> {
        let values: Vec<T> = values.iter().copied().collect();
        Self::from_slice(&values, block_size)
    }

    /// Concatenate the blocks into an `ndarray` vector.
    pub fn to_array(&self) -> Array1<T> {
        Array1::from_vec(self.data.clone())
    }

    /// All values in block order
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Total number of values (M·N)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of blocks (M)
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Values per block (N)
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Values of block `m`.
    pub fn block(&self, m: usize) -> Result<&[T]> {
        let range = self.block_range(m)?;
        Ok(&self.data[range])
    }

    /// Mutable values of block `m`.
    pub fn block_mut(&mut self, m: usize) -> Result<&mut [T]> {
        let range = self.block_range(m)?;
        Ok(&mut self.data[range])
    }

    pub fn block_view(&self, m: usize) -> Result<ArrayView1<'_, T>> {
        Ok(ArrayView1::from(self.block(m)?))
    }

    pub fn block_view_mut(&mut self, m: usize) -> Result<ArrayViewMut1<'_, T>> {
        Ok(ArrayViewMut1::from(self.block_mut(m)?))
    }

    /// Disjoint mutable slices of every block, in order.
    pub(crate) fn blocks_mut(&mut self) -> impl Iterator<Item = &mut [T]> {
        self.data.chunks_exact_mut(self.block_size)
    }

    fn block_range(&self, m: usize) -> Result<std::ops::Range<usize>> {
        if m >= self.blocks {
            return Err(TiledLuError::TileOutOfBounds {
                row: m,
                col: 0,
                tiles: self.blocks,
            });
        }
        Ok(m * self.block_size..(m + 1) * self.block_size)
    }
}
