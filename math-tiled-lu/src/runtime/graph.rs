//! Dependency derivation from declared buffer accesses
//!
//! Operations are recorded in submission order. Each one depends on the last
//! writer of every buffer it touches, and a writing operation also depends on
//! every reader since that writer (read-after-write, write-after-read and
//! write-after-write). Anything without such a chain is free to run in
//! parallel.

use super::buffer::{AccessMode, BufferHandle, BufferView};
use crate::error::Result;
use std::fmt;

/// Broad category of an operation, used for statistics and log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    FactorizeDiagonal,
    RowPanelSolve,
    ColumnPanelSolve,
    TrailingUpdate,
    ForwardUpdate,
    ForwardSolve,
    BackwardUpdate,
    BackwardSolve,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::FactorizeDiagonal => "getrf",
            OperationKind::RowPanelSolve => "trsm-row",
            OperationKind::ColumnPanelSolve => "trsm-col",
            OperationKind::TrailingUpdate => "gemm",
            OperationKind::ForwardUpdate => "gemv-fwd",
            OperationKind::ForwardSolve => "trsv-fwd",
            OperationKind::BackwardUpdate => "gemv-bwd",
            OperationKind::BackwardSolve => "trsv-bwd",
        };
        f.write_str(name)
    }
}

/// Identifier of a submitted operation, unique for the lifetime of a runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) usize);

pub(crate) type Kernel<'a, T> =
    Box<dyn for<'v, 'g> FnOnce(&'v mut [BufferView<'g, T>]) -> Result<()> + Send + 'a>;

pub(crate) struct Task<'a, T> {
    pub(crate) label: String,
    pub(crate) kind: OperationKind,
    pub(crate) accesses: Vec<(BufferHandle, AccessMode)>,
    /// Positions (within the current batch) of the operations this one waits for
    pub(crate) dependencies: Vec<usize>,
    pub(crate) kernel: Kernel<'a, T>,
}

#[derive(Debug, Clone, Default)]
struct BufferState {
    last_writer: Option<usize>,
    readers: Vec<usize>,
}

/// Operations submitted since the last synchronization point.
pub(crate) struct TaskGraph<'a, T> {
    tasks: Vec<Task<'a, T>>,
    buffers: Vec<BufferState>,
    /// Global id of the first task of the current batch
    base: usize,
}

impl<'a, T> TaskGraph<'a, T> {
    pub(crate) fn new() -> Self {
        Self {
            tasks: Vec::new(),
            buffers: Vec::new(),
            base: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Record an operation and derive its dependencies.
    pub(crate) fn push(
        &mut self,
        label: String,
        kind: OperationKind,
        accesses: Vec<(BufferHandle, AccessMode)>,
        kernel: Kernel<'a, T>,
    ) -> TaskId {
        let position = self.tasks.len();
        let mut dependencies = Vec::new();

        for &(BufferHandle(buffer), mode) in &accesses {
            if buffer >= self.buffers.len() {
                self.buffers.resize_with(buffer + 1, BufferState::default);
            }
            let state = &mut self.buffers[buffer];

            if let Some(writer) = state.last_writer {
                dependencies.push(writer);
            }
            if mode.writes() {
                dependencies.extend(state.readers.iter().copied());
                state.readers.clear();
                state.last_writer = Some(position);
            } else {
                state.readers.push(position);
            }
        }

        dependencies.sort_unstable();
        dependencies.dedup();

        self.tasks.push(Task {
            label,
            kind,
            accesses,
            dependencies,
            kernel,
        });
        TaskId(self.base + position)
    }

    /// Dependencies of a task of the current batch, as global ids.
    pub(crate) fn dependencies(&self, id: TaskId) -> Option<Vec<TaskId>> {
        let position = id.0.checked_sub(self.base)?;
        let task = self.tasks.get(position)?;
        Some(
            task.dependencies
                .iter()
                .map(|&d| TaskId(self.base + d))
                .collect(),
        )
    }

    /// Hand over the current batch and start a new one.
    ///
    /// Every operation of the batch completes before the next batch runs, so
    /// the access history can be forgotten.
    pub(crate) fn take_batch(&mut self) -> Vec<Task<'a, T>> {
        self.base += self.tasks.len();
        self.buffers.clear();
        std::mem::take(&mut self.tasks)
    }
}
