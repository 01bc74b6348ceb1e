//! Right-looking tiled LU factorization
//!
//! Level `l` of an `M`×`M` grid submits:
//!
//! 1. the factorization of diagonal tile `(l, l)` with tile-local pivoting,
//! 2. the block-row panel `(l, n)`, `n > l`: pivots of level `l` applied,
//!    then `L_ll⁻¹` from the left, turning each tile into `U_ln`,
//! 3. the block-column panel `(m, l)`, `m > l`: `U_ll⁻¹` from the right,
//!    turning each tile into `L_ml`,
//! 4. the trailing update `(m, n) ← (m, n) − L_ml·U_ln` for `m, n > l`.
//!
//! The order of execution follows from the declared accesses only; the
//! level loop never waits unless the policy asks for it.

use super::MatrixHandles;
use crate::config::SyncPolicy;
use crate::error::{KernelError, Result, TiledLuError};
use crate::kernels::{Diag, Side, TileKernels, Uplo};
use crate::runtime::{AccessMode, OperationKind, Runtime, TaskId, expect_buffers};
use crate::tile::TileIndex;
use crate::traits::Scalar;

/// Submit every level of the factorization.
///
/// With [`SyncPolicy::Barrier`] the runtime is drained after each diagonal
/// factorization, so a singular tile stops the run before any operation of
/// that level's panels is submitted. With [`SyncPolicy::Dataflow`] nothing is
/// waited for here.
pub fn submit_factorization<'a, T, K>(
    runtime: &mut Runtime<'a, T>,
    handles: &MatrixHandles,
    kernels: &'a K,
    sync: SyncPolicy,
) -> Result<()>
where
    T: Scalar,
    K: TileKernels<T> + ?Sized,
{
    let tiles = handles.tiles();
    for level in 0..tiles {
        submit_diagonal_factorization(runtime, handles, kernels, level)?;
        if sync == SyncPolicy::Barrier {
            runtime.wait_for_all()?;
        }

        let panels = submit_panel_solves(runtime, handles, kernels, level)?;
        let updates = submit_trailing_updates(runtime, handles, kernels, level)?;
        log::debug!(
            "level {level}/{tiles}: {} panel solves, {} trailing updates",
            panels.len(),
            updates.len()
        );
    }
    Ok(())
}

/// Factor diagonal tile `(level, level)` in place and record its pivots.
pub fn submit_diagonal_factorization<'a, T, K>(
    runtime: &mut Runtime<'a, T>,
    handles: &MatrixHandles,
    kernels: &'a K,
    level: usize,
) -> Result<TaskId>
where
    T: Scalar,
    K: TileKernels<T> + ?Sized,
{
    check_level(handles, level)?;
    let n = handles.tile_size();

    runtime.submit(
        format!("getrf{}", TileIndex::new(level, level)),
        OperationKind::FactorizeDiagonal,
        &[
            (handles.tile(level, level), AccessMode::ReadWrite),
            (handles.pivots(level), AccessMode::Write),
        ],
        move |buffers| {
            let [tile, pivots] = expect_buffers::<T, 2>(buffers)?;
            kernels
                .factorize(tile.values_mut()?, n, pivots.pivots_mut()?)
                .map_err(|err| match err {
                    KernelError::ZeroPivot { column, .. } => TiledLuError::SingularTile {
                        row: level,
                        col: level,
                        column,
                    },
                    other => other.into(),
                })
        },
    )
}

/// Submit both panels of `level`; returns the ids in submission order.
pub fn submit_panel_solves<'a, T, K>(
    runtime: &mut Runtime<'a, T>,
    handles: &MatrixHandles,
    kernels: &'a K,
    level: usize,
) -> Result<Vec<TaskId>>
where
    T: Scalar,
    K: TileKernels<T> + ?Sized,
{
    check_level(handles, level)?;
    let (tiles, n) = (handles.tiles(), handles.tile_size());
    let diagonal = handles.tile(level, level);
    let mut ids = Vec::with_capacity(2 * (tiles - level - 1));

    for k in (level + 1)..tiles {
        // Block row: U_lk = L_ll⁻¹·P_l·A_lk
        ids.push(runtime.submit(
            format!("trsm-row{}", TileIndex::new(level, k)),
            OperationKind::RowPanelSolve,
            &[
                (diagonal, AccessMode::Read),
                (handles.pivots(level), AccessMode::Read),
                (handles.tile(level, k), AccessMode::ReadWrite),
            ],
            move |buffers| {
                let [lu, pivots, target] = expect_buffers::<T, 3>(buffers)?;
                let target = target.values_mut()?;
                kernels.apply_pivots(pivots.pivots()?, target, n, n)?;
                kernels.triangular_solve(
                    Side::Left,
                    Uplo::Lower,
                    Diag::Unit,
                    lu.values()?,
                    n,
                    target,
                    n,
                )?;
                Ok(())
            },
        )?);

        // Block column: L_kl = A_kl·U_ll⁻¹
        ids.push(runtime.submit(
            format!("trsm-col{}", TileIndex::new(k, level)),
            OperationKind::ColumnPanelSolve,
            &[
                (diagonal, AccessMode::Read),
                (handles.tile(k, level), AccessMode::ReadWrite),
            ],
            move |buffers| {
                let [lu, target] = expect_buffers::<T, 2>(buffers)?;
                kernels.triangular_solve(
                    Side::Right,
                    Uplo::Upper,
                    Diag::NonUnit,
                    lu.values()?,
                    n,
                    target.values_mut()?,
                    n,
                )?;
                Ok(())
            },
        )?);
    }
    Ok(ids)
}

/// Submit the trailing update of every tile below and right of `level`.
pub fn submit_trailing_updates<'a, T, K>(
    runtime: &mut Runtime<'a, T>,
    handles: &MatrixHandles,
    kernels: &'a K,
    level: usize,
) -> Result<Vec<TaskId>>
where
    T: Scalar,
    K: TileKernels<T> + ?Sized,
{
    check_level(handles, level)?;
    let (tiles, n) = (handles.tiles(), handles.tile_size());
    let remaining = tiles - level - 1;
    let mut ids = Vec::with_capacity(remaining * remaining);

    for m in (level + 1)..tiles {
        for k in (level + 1)..tiles {
            ids.push(runtime.submit(
                format!("gemm{} level {level}", TileIndex::new(m, k)),
                OperationKind::TrailingUpdate,
                &[
                    (handles.tile(m, level), AccessMode::Read),
                    (handles.tile(level, k), AccessMode::Read),
                    (handles.tile(m, k), AccessMode::ReadWrite),
                ],
                move |buffers| {
                    let [a, b, c] = expect_buffers::<T, 3>(buffers)?;
                    kernels.multiply_subtract(a.values()?, b.values()?, c.values_mut()?, n, n)?;
                    Ok(())
                },
            )?);
        }
    }
    Ok(ids)
}

fn check_level(handles: &MatrixHandles, level: usize) -> Result<()> {
    if level >= handles.tiles() {
        return Err(TiledLuError::TileOutOfBounds {
            row: level,
            col: level,
            tiles: handles.tiles(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::NativeKernels;
    use crate::tile::{PivotTable, TileMatrix};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_single_level_dependencies() {
        let a = array![[4.0, 1.0], [2.0, 5.0]];
        let mut matrix = TileMatrix::from_dense(&a, 1).unwrap();
        let mut pivots = PivotTable::identity(2, 1).unwrap();
        let kernels = NativeKernels::default();
        let mut rt = Runtime::new(2).unwrap();
        let handles = MatrixHandles::register(&mut rt, &mut matrix, &mut pivots).unwrap();

        let getrf = submit_diagonal_factorization(&mut rt, &handles, &kernels, 0).unwrap();
        let panels = submit_panel_solves(&mut rt, &handles, &kernels, 0).unwrap();
        let updates = submit_trailing_updates(&mut rt, &handles, &kernels, 0).unwrap();

        assert_eq!(panels.len(), 2);
        assert_eq!(rt.dependencies(panels[0]).unwrap(), vec![getrf]);
        assert_eq!(rt.dependencies(panels[1]).unwrap(), vec![getrf]);
        assert_eq!(rt.dependencies(updates[0]).unwrap(), panels);
        rt.release().unwrap();
    }

    #[test]
    fn test_scalar_tiles_match_hand_elimination() {
        // 1x1 tiles: the grid factorization is plain Doolittle without pivoting
        let a = array![[4.0, 1.0], [2.0, 5.0]];
        let mut matrix = TileMatrix::from_dense(&a, 1).unwrap();
        let mut pivots = PivotTable::identity(2, 1).unwrap();
        let kernels = NativeKernels::default();
        {
            let mut rt = Runtime::new(2).unwrap();
            let handles = MatrixHandles::register(&mut rt, &mut matrix, &mut pivots).unwrap();
            submit_factorization(&mut rt, &handles, &kernels, SyncPolicy::Dataflow).unwrap();
            rt.release().unwrap();
        }

        let lu = matrix.to_dense();
        assert_abs_diff_eq!(lu[[0, 0]], 4.0);
        assert_abs_diff_eq!(lu[[0, 1]], 1.0);
        assert_abs_diff_eq!(lu[[1, 0]], 0.5);
        assert_abs_diff_eq!(lu[[1, 1]], 4.5);
    }

    #[test]
    fn test_barrier_stops_at_singular_tile() {
        let a = array![[0.0, 1.0], [1.0, 1.0]];
        let mut matrix = TileMatrix::from_dense(&a, 1).unwrap();
        let mut pivots = PivotTable::identity(2, 1).unwrap();
        let kernels = NativeKernels::default();
        let mut rt = Runtime::new(1).unwrap();
        let handles = MatrixHandles::register(&mut rt, &mut matrix, &mut pivots).unwrap();

        let err = submit_factorization(&mut rt, &handles, &kernels, SyncPolicy::Barrier)
            .unwrap_err();
        assert!(matches!(
            err,
            TiledLuError::SingularTile {
                row: 0,
                col: 0,
                column: 0
            }
        ));
        assert_eq!(rt.pending(), 0);
    }

    #[test]
    fn test_level_out_of_range() {
        let mut matrix = TileMatrix::<f64>::zeros(2, 2).unwrap();
        let mut pivots = PivotTable::identity(2, 2).unwrap();
        let kernels = NativeKernels::default();
        let mut rt = Runtime::new(1).unwrap();
        let handles = MatrixHandles::register(&mut rt, &mut matrix, &mut pivots).unwrap();

        let err = submit_panel_solves(&mut rt, &handles, &kernels, 2).unwrap_err();
        assert!(matches!(err, TiledLuError::TileOutOfBounds { .. }));
    }
}
