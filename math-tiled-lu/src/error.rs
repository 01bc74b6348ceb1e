//! Error types for the tiled LU solver.
//!
//! Every error is fatal for a run: there is no partial-result mode. The
//! variants are grouped by the phase that raises them (setup, scheduling,
//! numeric kernels) and the `is_*` helpers let callers categorize them.

use thiserror::Error;

/// Errors raised by a numeric tile kernel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// No usable pivot was found in a column of the tile, even after row exchange.
    #[error("zero pivot in column {column} (magnitude {magnitude:e})")]
    ZeroPivot {
        /// Column of the tile where elimination stopped
        column: usize,
        /// Magnitude of the best pivot candidate
        magnitude: f64,
    },

    /// A buffer handed to the kernel does not have the declared shape.
    #[error("kernel operand has {got} values, expected {expected}")]
    ShapeMismatch {
        /// Number of values implied by the declared shape
        expected: usize,
        /// Number of values actually provided
        got: usize,
    },
}

/// Errors that can occur while building, factoring or solving a tiled system.
#[derive(Debug, Error)]
pub enum TiledLuError {
    /// A diagonal tile has no usable pivot.
    #[error("singular diagonal tile ({row}, {col}): no usable pivot in column {column}")]
    SingularTile {
        /// Block row of the tile
        row: usize,
        /// Block column of the tile
        col: usize,
        /// Column inside the tile where factorization failed
        column: usize,
    },

    /// The worker pool or a registered buffer could not be set up or accessed.
    #[error("scheduler resource error: {reason}")]
    SchedulerResource {
        /// Human readable cause
        reason: String,
    },

    /// Problem dimensions are invalid or incompatible.
    #[error("dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// What was being checked
        what: &'static str,
        /// Expected size
        expected: usize,
        /// Actual size
        got: usize,
    },

    /// A tile index lies outside the grid.
    #[error("tile ({row}, {col}) is outside the {tiles}x{tiles} grid")]
    TileOutOfBounds {
        /// Requested block row
        row: usize,
        /// Requested block column
        col: usize,
        /// Number of tiles per grid dimension
        tiles: usize,
    },

    /// An operation declaration is malformed.
    #[error("invalid access declaration for operation '{operation}': {reason}")]
    InvalidAccess {
        /// Label of the offending operation
        operation: String,
        /// What is wrong with it
        reason: String,
    },

    /// A numeric kernel rejected its operands.
    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A specialized `Result` type for tiled LU operations.
pub type Result<T> = std::result::Result<T, TiledLuError>;

impl TiledLuError {
    /// Returns `true` if a diagonal tile turned out to be singular.
    pub fn is_singular(&self) -> bool {
        matches!(
            self,
            TiledLuError::SingularTile { .. }
                | TiledLuError::Kernel(KernelError::ZeroPivot { .. })
        )
    }

    /// Returns `true` for setup errors about sizes and indices.
    pub fn is_dimension_error(&self) -> bool {
        matches!(
            self,
            TiledLuError::DimensionMismatch { .. }
                | TiledLuError::TileOutOfBounds { .. }
                | TiledLuError::Kernel(KernelError::ShapeMismatch { .. })
        )
    }

    /// Returns `true` if the task runtime failed.
    pub fn is_scheduler_error(&self) -> bool {
        matches!(
            self,
            TiledLuError::SchedulerResource { .. } | TiledLuError::InvalidAccess { .. }
        )
    }

    pub(crate) fn dimension(what: &'static str, expected: usize, got: usize) -> Self {
        TiledLuError::DimensionMismatch {
            what,
            expected,
            got,
        }
    }
}
