//! Tiled LU factorization and substitution
//!
//! - [`tiled_lu_factorize`] / [`tiled_lu_solve`]: the solver entry points
//! - [`submit_factorization`] and the per-level submitters, for driving a
//!   [`Runtime`](crate::runtime::Runtime) directly
//! - [`submit_forward_substitution`] / [`submit_backward_substitution`]

mod factorize;
mod handles;
mod substitution;
mod tiled_lu;

pub use factorize::{
    submit_diagonal_factorization, submit_factorization, submit_panel_solves,
    submit_trailing_updates,
};
pub use handles::{MatrixHandles, register_vector};
pub use substitution::{submit_backward_substitution, submit_forward_substitution};
pub use tiled_lu::{
    TiledLuFactorization, TiledLuSolution, tiled_lu_factorize, tiled_lu_factorize_with,
    tiled_lu_solve,
};
