//! Reproducible test systems
//!
//! Builds a strictly row diagonally dominant matrix, a known solution and
//! the matching right-hand side. Diagonal dominance guarantees that pivoting
//! inside the diagonal tiles is enough for a stable factorization.

use crate::config::ProblemConfig;
use crate::error::Result;
use crate::tile::{TileMatrix, TileVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A system `A·x_known = b` with its known solution.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagonallyDominantProblem {
    pub matrix: TileMatrix<f64>,
    pub x_known: TileVector<f64>,
    pub b: TileVector<f64>,
}

impl DiagonallyDominantProblem {
    /// Generate an `M`×`M` grid of `N`×`N` tiles from `seed`.
    ///
    /// Off-diagonal entries are uniform in `[0, 1)`. Each diagonal entry is
    /// one plus the sum of the magnitudes of its row's off-diagonal entries
    /// plus a uniform `[0, 1)` draw. The same seed always gives the same
    /// problem.
    pub fn generate(tiles: usize, tile_size: usize, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut matrix = TileMatrix::zeros(tiles, tile_size)?;
        let order = matrix.order();
        let mut row_sums = vec![0.0; order];

        for r in 0..tiles {
            for c in 0..tiles {
                let mut tile = matrix.tile_view_mut(r, c)?;
                for ((i, j), v) in tile.indexed_iter_mut() {
                    if r == c && i == j {
                        continue;
                    }
                    let value = rng.random::<f64>();
                    *v = value;
                    row_sums[r * tile_size + i] += value.abs();
                }
            }
        }

        for r in 0..tiles {
            let mut tile = matrix.tile_view_mut(r, r)?;
            for i in 0..tile_size {
                tile[[i, i]] = 1.0 + row_sums[r * tile_size + i] + rng.random::<f64>();
            }
        }

        let values: Vec<f64> = (0..order).map(|_| rng.random::<f64>()).collect();
        let x_known = TileVector::from_slice(&values, tile_size)?;
        let b = matrix.matvec(&x_known)?;

        log::debug!("generated {order}x{order} diagonally dominant system (seed {seed})");
        Ok(Self { matrix, x_known, b })
    }

    pub fn from_config(config: &ProblemConfig) -> Result<Self> {
        config.validate()?;
        Self::generate(config.tiles, config.tile_size, config.seed)
    }
}
