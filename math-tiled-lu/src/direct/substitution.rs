//! Forward and backward substitution against factored tiles
//!
//! Both sweeps overwrite the right-hand-side blocks in place: the forward
//! sweep leaves `y` with `L·y = P·b`, the backward sweep then leaves `x` with
//! `U·x = y`.

use super::MatrixHandles;
use crate::error::{Result, TiledLuError};
use crate::kernels::{Diag, Side, TileKernels, Uplo};
use crate::runtime::{AccessMode, BufferHandle, OperationKind, Runtime, TaskId, expect_buffers};
use crate::tile::TileIndex;
use crate::traits::Scalar;

/// Submit the forward sweep, block rows `0..M`.
pub fn submit_forward_substitution<'a, T, K>(
    runtime: &mut Runtime<'a, T>,
    handles: &MatrixHandles,
    rhs: &[BufferHandle],
    kernels: &'a K,
) -> Result<Vec<TaskId>>
where
    T: Scalar,
    K: TileKernels<T> + ?Sized,
{
    check_blocks(handles, rhs)?;
    let (tiles, n) = (handles.tiles(), handles.tile_size());
    let mut ids = Vec::with_capacity(tiles * (tiles + 1) / 2);

    for m in 0..tiles {
        for k in 0..m {
            ids.push(submit_block_update(
                runtime,
                OperationKind::ForwardUpdate,
                format!("gemv-fwd{}", TileIndex::new(m, k)),
                [handles.tile(m, k), rhs[k], rhs[m]],
                kernels,
                n,
            )?);
        }

        ids.push(runtime.submit(
            format!("trsv-fwd({m})"),
            OperationKind::ForwardSolve,
            &[
                (handles.tile(m, m), AccessMode::Read),
                (handles.pivots(m), AccessMode::Read),
                (rhs[m], AccessMode::ReadWrite),
            ],
            move |buffers| {
                let [lu, pivots, block] = expect_buffers::<T, 3>(buffers)?;
                let block = block.values_mut()?;
                kernels.apply_pivots(pivots.pivots()?, block, n, 1)?;
                kernels.triangular_solve(
                    Side::Left,
                    Uplo::Lower,
                    Diag::Unit,
                    lu.values()?,
                    n,
                    block,
                    1,
                )?;
                Ok(())
            },
        )?);
    }
    Ok(ids)
}

/// Submit the backward sweep, block rows `M-1` down to `0`.
pub fn submit_backward_substitution<'a, T, K>(
    runtime: &mut Runtime<'a, T>,
    handles: &MatrixHandles,
    rhs: &[BufferHandle],
    kernels: &'a K,
) -> Result<Vec<TaskId>>
where
    T: Scalar,
    K: TileKernels<T> + ?Sized,
{
    check_blocks(handles, rhs)?;
    let (tiles, n) = (handles.tiles(), handles.tile_size());
    let mut ids = Vec::with_capacity(tiles * (tiles + 1) / 2);

    for m in (0..tiles).rev() {
        for k in (m + 1)..tiles {
            ids.push(submit_block_update(
                runtime,
                OperationKind::BackwardUpdate,
                format!("gemv-bwd{}", TileIndex::new(m, k)),
                [handles.tile(m, k), rhs[k], rhs[m]],
                kernels,
                n,
            )?);
        }

        ids.push(runtime.submit(
            format!("trsv-bwd({m})"),
            OperationKind::BackwardSolve,
            &[
                (handles.tile(m, m), AccessMode::Read),
                (rhs[m], AccessMode::ReadWrite),
            ],
            move |buffers| {
                let [lu, block] = expect_buffers::<T, 2>(buffers)?;
                kernels.triangular_solve(
                    Side::Left,
                    Uplo::Upper,
                    Diag::NonUnit,
                    lu.values()?,
                    n,
                    block.values_mut()?,
                    1,
                )?;
                Ok(())
            },
        )?);
    }
    Ok(ids)
}

/// `b[m] ← b[m] − A[m, k]·b[k]`, the operands given as `[tile, b[k], b[m]]`.
fn submit_block_update<'a, T, K>(
    runtime: &mut Runtime<'a, T>,
    kind: OperationKind,
    label: String,
    [tile, source, target]: [BufferHandle; 3],
    kernels: &'a K,
    n: usize,
) -> Result<TaskId>
where
    T: Scalar,
    K: TileKernels<T> + ?Sized,
{
    runtime.submit(
        label,
        kind,
        &[
            (tile, AccessMode::Read),
            (source, AccessMode::Read),
            (target, AccessMode::ReadWrite),
        ],
        move |buffers| {
            let [a, x, b] = expect_buffers::<T, 3>(buffers)?;
            kernels.multiply_subtract(a.values()?, x.values()?, b.values_mut()?, n, 1)?;
            Ok(())
        },
    )
}

fn check_blocks(handles: &MatrixHandles, rhs: &[BufferHandle]) -> Result<()> {
    if rhs.len() != handles.tiles() {
        return Err(TiledLuError::dimension(
            "right-hand side blocks",
            handles.tiles(),
            rhs.len(),
        ));
    }
    Ok(())
}
