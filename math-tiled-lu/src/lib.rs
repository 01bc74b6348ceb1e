//! Tiled LU factorization on a dependency-tracking task runtime
//!
//! This crate solves dense systems `A·x = b` by a blocked ("tiled") LU
//! factorization with partial pivoting confined to the diagonal tiles. Every
//! tile operation is submitted to a small task runtime together with the
//! buffers it reads and writes; independent operations then run
//! concurrently on a `rayon` thread pool.
//!
//! # Features
//!
//! - **Tile storage**: [`TileMatrix`], [`TileVector`] and [`PivotTable`] in
//!   single contiguous arenas
//! - **Tile kernels**: the [`TileKernels`] trait (getrf, laswp, trsm, gemm)
//!   and its pure-Rust [`NativeKernels`] implementation
//! - **Task runtime**: buffer registration, dependency derivation from
//!   [`AccessMode`]s, dataflow execution
//! - **Solver**: right-looking factorization, forward and backward
//!   substitution, residual check
//! - **Generic Scalar Types**: f64, f32, Complex64, Complex32
//!
//! # Example
//!
//! ```
//! use math_audio_tiled_lu::{
//!     DiagonallyDominantProblem, TiledLuConfig, relative_error, tiled_lu_solve,
//! };
//!
//! let problem = DiagonallyDominantProblem::generate(3, 8, 42)?;
//! let solution = tiled_lu_solve(problem.matrix, &problem.b, &TiledLuConfig::default())?;
//! let error = relative_error(problem.x_known.as_slice(), solution.x.as_slice())?;
//! assert!(error < 1e-9);
//! # Ok::<(), math_audio_tiled_lu::TiledLuError>(())
//! ```
//!
//! Diagonally dominant inputs are a precondition: rows are never exchanged
//! across tile boundaries.

pub mod config;
pub mod direct;
pub mod error;
pub mod kernels;
pub mod problem;
pub mod residual;
pub mod runtime;
pub mod tile;
pub mod traits;

// Re-export main types
pub use config::{ProblemConfig, RunConfig, SyncPolicy, TiledLuConfig};
pub use error::{KernelError, Result, TiledLuError};
pub use tile::{PivotTable, TileIndex, TileMatrix, TileVector};
pub use traits::Scalar;

// Re-export the solver
pub use direct::{
    TiledLuFactorization, TiledLuSolution, tiled_lu_factorize, tiled_lu_factorize_with,
    tiled_lu_solve,
};

// Re-export collaborators
pub use kernels::{Diag, NativeKernels, Side, TileKernels, Uplo};
pub use runtime::{AccessMode, BufferHandle, OperationKind, Runtime, RuntimeStats};

pub use problem::DiagonallyDominantProblem;
pub use residual::relative_error;
