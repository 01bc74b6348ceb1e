//! Tiled LU solver
//!
//! Factors a [`TileMatrix`] with partial pivoting confined to diagonal tiles
//! and solves against the packed factors. The input is required to be
//! block diagonally dominant enough that no cross-tile pivoting is needed;
//! strictly row diagonally dominant matrices always qualify.

use super::{
    MatrixHandles, register_vector, submit_backward_substitution, submit_factorization,
    submit_forward_substitution,
};
use crate::config::TiledLuConfig;
use crate::error::{Result, TiledLuError};
use crate::kernels::{NativeKernels, TileKernels};
use crate::runtime::{Runtime, RuntimeStats, build_pool};
use crate::tile::{PivotTable, TileMatrix, TileVector};
use crate::traits::Scalar;
use ndarray::Array2;
use rayon::ThreadPool;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

/// Packed tiled LU factors with their tile-local pivots.
///
/// Holds the worker pool used for the factorization so that later solves
/// reuse it.
pub struct TiledLuFactorization<T: Scalar, K: TileKernels<T> = NativeKernels> {
    factors: TileMatrix<T>,
    pivots: PivotTable,
    kernels: K,
    pool: Arc<ThreadPool>,
    stats: RuntimeStats,
}

impl<T: Scalar, K: TileKernels<T>> std::fmt::Debug for TiledLuFactorization<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiledLuFactorization")
            .field("tiles", &self.factors.tiles())
            .field("tile_size", &self.factors.tile_size())
            .field("threads", &self.pool.current_num_threads())
            .field("stats", &self.stats)
            .finish()
    }
}

/// Result of [`tiled_lu_solve`]
#[derive(Debug)]
pub struct TiledLuSolution<T: Scalar> {
    /// Solution vector
    pub x: TileVector<T>,
    /// Factorization the solution was computed from
    pub factorization: TiledLuFactorization<T>,
    /// Operations run by the substitution
    pub solve_stats: RuntimeStats,
}

/// Factor `matrix` in place with [`NativeKernels`].
pub fn tiled_lu_factorize<T: Scalar>(
    matrix: TileMatrix<T>,
    config: &TiledLuConfig,
) -> Result<TiledLuFactorization<T>> {
    tiled_lu_factorize_with(matrix, NativeKernels::new(config.pivot_tolerance), config)
}

/// Factor `matrix` in place with the given tile kernels.
///
/// `config.pivot_tolerance` is not used here; the kernels carry their own.
pub fn tiled_lu_factorize_with<T: Scalar, K: TileKernels<T>>(
    matrix: TileMatrix<T>,
    kernels: K,
    config: &TiledLuConfig,
) -> Result<TiledLuFactorization<T, K>> {
    config.validate()?;
    let pool = build_pool(config.threads)?;
    let mut factors = matrix;
    let mut pivots = PivotTable::identity(factors.tiles(), factors.tile_size())?;

    let start = Instant::now();
    let (stats, threads) = {
        let mut runtime = Runtime::with_pool(Arc::clone(&pool));
        let threads = runtime.threads();
        let handles = MatrixHandles::register(&mut runtime, &mut factors, &mut pivots)?;
        submit_factorization(&mut runtime, &handles, &kernels, config.sync)?;
        (runtime.release()?, threads)
    };

    log::info!(
        "factored {}x{} tiles of order {} in {:.3?} ({} operations, {threads} threads, {:?})",
        factors.tiles(),
        factors.tiles(),
        factors.tile_size(),
        start.elapsed(),
        stats.executed,
        config.sync
    );
    log::debug!("factorization statistics: {stats:?}");

    Ok(TiledLuFactorization {
        factors,
        pivots,
        kernels,
        pool,
        stats,
    })
}

/// Factor `matrix` and solve `A·x = b` in one call.
pub fn tiled_lu_solve<T: Scalar>(
    matrix: TileMatrix<T>,
    b: &TileVector<T>,
    config: &TiledLuConfig,
) -> Result<TiledLuSolution<T>> {
    let factorization = tiled_lu_factorize(matrix, config)?;
    let mut x = b.clone();
    let solve_stats = factorization.solve_in_place(&mut x)?;
    Ok(TiledLuSolution {
        x,
        factorization,
        solve_stats,
    })
}

impl<T: Scalar, K: TileKernels<T>> TiledLuFactorization<T, K> {
    /// Packed factors: unit-lower `L` below the diagonal of every tile grid,
    /// `U` on and above it
    pub fn factors(&self) -> &TileMatrix<T> {
        &self.factors
    }

    pub fn pivots(&self) -> &PivotTable {
        &self.pivots
    }

    pub fn tiles(&self) -> usize {
        self.factors.tiles()
    }

    pub fn tile_size(&self) -> usize {
        self.factors.tile_size()
    }

    /// Statistics of the factorization run
    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    /// Solve `A·x = b`, leaving `b` untouched.
    pub fn solve(&self, b: &TileVector<T>) -> Result<TileVector<T>> {
        let mut x = b.clone();
        self.solve_in_place(&mut x)?;
        Ok(x)
    }

    /// Overwrite `b` with the solution of `A·x = b`.
    ///
    /// The factors are only read, so several solves may share a
    /// factorization.
    pub fn solve_in_place(&self, b: &mut TileVector<T>) -> Result<RuntimeStats> {
        if b.blocks() != self.tiles() {
            return Err(TiledLuError::dimension(
                "right-hand side blocks",
                self.tiles(),
                b.blocks(),
            ));
        }
        if b.block_size() != self.tile_size() {
            return Err(TiledLuError::dimension(
                "right-hand side block size",
                self.tile_size(),
                b.block_size(),
            ));
        }

        let start = Instant::now();
        let mut runtime = Runtime::with_pool(Arc::clone(&self.pool));
        let handles = MatrixHandles::register_shared(&mut runtime, &self.factors, &self.pivots)?;
        let rhs = register_vector(&mut runtime, b)?;
        submit_forward_substitution(&mut runtime, &handles, &rhs, &self.kernels)?;
        submit_backward_substitution(&mut runtime, &handles, &rhs, &self.kernels)?;
        let stats = runtime.release()?;

        log::info!(
            "solved {} unknowns in {:.3?} ({} operations)",
            self.factors.order(),
            start.elapsed(),
            stats.executed
        );
        Ok(stats)
    }

    /// Multiply the packed factors back together.
    ///
    /// The tile-local row exchanges are undone on the diagonal blocks of
    /// `L`, so the product reproduces the matrix that was factored, up to
    /// rounding.
    pub fn reconstruct(&self) -> Array2<T> {
        let (tiles, n) = (self.tiles(), self.tile_size());
        let order = tiles * n;
        let packed = self.factors.to_dense();
        let mut lower = Array2::<T>::zeros((order, order));
        let mut upper = Array2::<T>::zeros((order, order));

        // P_l⁻¹ on the diagonal blocks: row i of L_ll lands on row permutation[i]
        let permutation = self.pivots.row_permutation();
        for (i, &target) in permutation.iter().enumerate() {
            for j in 0..order {
                let v = packed[[i, j]];
                match (i / n).cmp(&(j / n)) {
                    Ordering::Greater => lower[[i, j]] = v,
                    Ordering::Equal if i > j => lower[[target, j]] = v,
                    _ => upper[[i, j]] = v,
                }
            }
            lower[[target, i]] = T::one();
        }

        lower.dot(&upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncPolicy;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn config(sync: SyncPolicy) -> TiledLuConfig {
        TiledLuConfig {
            threads: 2,
            sync,
            ..TiledLuConfig::default()
        }
    }

    #[test]
    fn test_pivoting_inside_single_tile() {
        let a = array![[4.0, 3.0], [6.0, 3.0]];
        let matrix = TileMatrix::from_dense(&a, 2).unwrap();
        let b = TileVector::from_slice(&[18.0, 24.0], 2).unwrap();

        let solution = tiled_lu_solve(matrix, &b, &config(SyncPolicy::Barrier)).unwrap();
        assert_abs_diff_eq!(solution.x.as_slice()[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(solution.x.as_slice()[1], 2.0, epsilon = 1e-12);
        assert_eq!(solution.factorization.pivots().pivots(0).unwrap(), &[1, 1]);
    }

    #[test]
    fn test_reconstruct_reproduces_input() {
        let a = array![
            [2.0, 7.0, 0.5, 0.1],
            [5.0, 1.0, 0.2, 0.3],
            [0.4, 0.1, 1.0, 9.0],
            [0.2, 0.3, 8.0, 1.0]
        ];
        let matrix = TileMatrix::from_dense(&a, 2).unwrap();
        let lu = tiled_lu_factorize(matrix, &config(SyncPolicy::Dataflow)).unwrap();

        let rebuilt = lu.reconstruct();
        for (x, y) in rebuilt.iter().zip(a.iter()) {
            assert_abs_diff_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_solve_rejects_wrong_length() {
        let matrix = TileMatrix::from_dense(&array![[2.0, 0.0], [0.0, 2.0]], 1).unwrap();
        let lu = tiled_lu_factorize(matrix, &TiledLuConfig::default()).unwrap();
        let b = TileVector::from_slice(&[1.0, 2.0, 3.0], 1).unwrap();
        assert!(lu.solve(&b).unwrap_err().is_dimension_error());
    }

    #[test]
    fn test_factorization_stats() {
        let matrix = TileMatrix::from_dense(&Array2::<f64>::eye(6), 2).unwrap();
        let lu = tiled_lu_factorize(matrix, &config(SyncPolicy::Barrier)).unwrap();
        // 3 getrf, 3+1 panel pairs, 4+1 gemm
        assert_eq!(lu.stats().executed, 3 + 6 + 5);
        // the last level has nothing left after its diagonal tile
        assert_eq!(lu.stats().synchronizations, 3);
    }
}
