//! Registered buffers and the views handed to running operations

use crate::error::{Result, TiledLuError};
use crate::traits::Scalar;
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

/// How an operation touches a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
    ReadWrite,
}

impl AccessMode {
    #[inline]
    pub fn writes(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

/// Opaque handle of a registered buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub(crate) usize);

/// Declared layout of a registered buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferShape {
    /// Row-major `rows`×`cols` values
    Matrix { rows: usize, cols: usize },
    /// `len` values
    Vector { len: usize },
}

impl BufferShape {
    pub fn len(&self) -> usize {
        match *self {
            BufferShape::Matrix { rows, cols } => rows * cols,
            BufferShape::Vector { len } => len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Storage borrowed by the runtime for the duration of a run.
pub(crate) enum BufferData<'a, T> {
    Values(&'a mut [T]),
    Shared(&'a [T]),
    Pivots(&'a mut [usize]),
    SharedPivots(&'a [usize]),
}

impl<T> BufferData<'_, T> {
    pub(crate) fn is_shared(&self) -> bool {
        matches!(self, BufferData::Shared(_) | BufferData::SharedPivots(_))
    }
}

/// Lock held on a buffer while an operation runs.
pub(crate) enum BufferGuard<'g, 'a, T> {
    Read(RwLockReadGuard<'g, BufferData<'a, T>>),
    Write(RwLockWriteGuard<'g, BufferData<'a, T>>),
}

impl<'a, T> BufferGuard<'_, 'a, T> {
    pub(crate) fn view(&mut self) -> BufferView<'_, T> {
        match self {
            BufferGuard::Read(guard) => match &**guard {
                BufferData::Values(values) => BufferView::Values(&values[..]),
                BufferData::Shared(values) => BufferView::Values(&values[..]),
                BufferData::Pivots(pivots) => BufferView::Pivots(&pivots[..]),
                BufferData::SharedPivots(pivots) => BufferView::Pivots(&pivots[..]),
            },
            BufferGuard::Write(guard) => match &mut **guard {
                BufferData::Values(values) => BufferView::ValuesMut(&mut values[..]),
                BufferData::Shared(values) => BufferView::Values(&values[..]),
                BufferData::Pivots(pivots) => BufferView::PivotsMut(&mut pivots[..]),
                BufferData::SharedPivots(pivots) => BufferView::Pivots(&pivots[..]),
            },
        }
    }
}

/// A buffer as seen by a running operation, in the mode it was declared with.
#[derive(Debug)]
pub enum BufferView<'g, T> {
    Values(&'g [T]),
    ValuesMut(&'g mut [T]),
    Pivots(&'g [usize]),
    PivotsMut(&'g mut [usize]),
}

impl<T> BufferView<'_, T> {
    pub fn values(&self) -> Result<&[T]> {
        match self {
            BufferView::Values(values) => Ok(&values[..]),
            BufferView::ValuesMut(values) => Ok(&values[..]),
            _ => Err(view_error("a value buffer")),
        }
    }

    pub fn values_mut(&mut self) -> Result<&mut [T]> {
        match self {
            BufferView::ValuesMut(values) => Ok(&mut values[..]),
            _ => Err(view_error("a writable value buffer")),
        }
    }

    pub fn pivots(&self) -> Result<&[usize]> {
        match self {
            BufferView::Pivots(pivots) => Ok(&pivots[..]),
            BufferView::PivotsMut(pivots) => Ok(&pivots[..]),
            _ => Err(view_error("a pivot buffer")),
        }
    }

    pub fn pivots_mut(&mut self) -> Result<&mut [usize]> {
        match self {
            BufferView::PivotsMut(pivots) => Ok(&mut pivots[..]),
            _ => Err(view_error("a writable pivot buffer")),
        }
    }
}

fn view_error(expected: &str) -> TiledLuError {
    TiledLuError::SchedulerResource {
        reason: format!("operation expected {expected}"),
    }
}

/// Borrow the views of an operation as a fixed-size array.
///
/// The executor always passes exactly the declared accesses, in order, so a
/// mismatch means the operation was declared with the wrong arity.
pub fn expect_buffers<'v, 'g, T: Scalar, const K: usize>(
    buffers: &'v mut [BufferView<'g, T>],
) -> Result<&'v mut [BufferView<'g, T>; K]> {
    let got = buffers.len();
    buffers
        .try_into()
        .map_err(|_| TiledLuError::SchedulerResource {
            reason: format!("operation expected {K} buffers, got {got}"),
        })
}
