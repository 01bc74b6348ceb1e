//! Dense tile kernels
//!
//! The factorization never touches tile values directly: it calls the four
//! primitives of [`TileKernels`] (getrf, laswp, trsm and gemm in BLAS terms)
//! on row-major slices. [`NativeKernels`] is the pure-Rust implementation.

mod native;

pub use native::{DEFAULT_PIVOT_TOLERANCE, NativeKernels};

use crate::error::KernelError;
use crate::traits::Scalar;

/// Which side the triangular factor multiplies the unknown from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Solve `T·X = B`
    Left,
    /// Solve `X·T = B`
    Right,
}

/// Which triangle of the packed tile holds the factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uplo {
    Lower,
    Upper,
}

/// Whether the diagonal of the triangular factor is implicitly one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diag {
    Unit,
    NonUnit,
}

/// Numeric primitives applied to single tiles.
///
/// Square operands are `n`×`n`. The other operand of a solve or update is
/// `n`×`width` (or `width`×`n` for a right-side solve); `width` is `n` for
/// tiles and 1 for right-hand-side blocks.
pub trait TileKernels<T: Scalar>: Send + Sync {
    /// In-place LU factorization with row pivoting restricted to the tile.
    ///
    /// On success the tile holds the unit-lower `L` strictly below the
    /// diagonal and `U` on and above it, and `pivots[i]` is the row
    /// exchanged with row `i` at step `i`.
    fn factorize(&self, tile: &mut [T], n: usize, pivots: &mut [usize]) -> Result<(), KernelError>;

    /// Apply the row exchanges of a factorization to an `n`×`width` operand.
    fn apply_pivots(
        &self,
        pivots: &[usize],
        target: &mut [T],
        n: usize,
        width: usize,
    ) -> Result<(), KernelError>;

    /// Overwrite `target` with the solution of the triangular system.
    #[allow(clippy::too_many_arguments)]
    fn triangular_solve(
        &self,
        side: Side,
        uplo: Uplo,
        diag: Diag,
        triangular: &[T],
        n: usize,
        target: &mut [T],
        width: usize,
    ) -> Result<(), KernelError>;

    /// `c ← c − a·b` with `a` `n`×`n` and `b`, `c` `n`×`width`.
    fn multiply_subtract(
        &self,
        a: &[T],
        b: &[T],
        c: &mut [T],
        n: usize,
        width: usize,
    ) -> Result<(), KernelError>;
}

pub(crate) fn check_len<T>(values: &[T], expected: usize) -> Result<(), KernelError> {
    if values.len() != expected {
        return Err(KernelError::ShapeMismatch {
            expected,
            got: values.len(),
        });
    }
    Ok(())
}
