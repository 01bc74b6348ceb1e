//! Task runtime
//!
//! A small dependency-tracking scheduler in the spirit of task-based
//! runtimes for dense linear algebra:
//!
//! 1. buffers are **registered**: the runtime borrows disjoint slices of the
//!    caller's arenas for as long as it lives,
//! 2. operations are **submitted** with the buffers they touch and an
//!    [`AccessMode`] for each; dependencies follow from those declarations,
//! 3. [`Runtime::wait_for_all`] runs everything submitted so far on a
//!    `rayon` thread pool, as soon as each operation's inputs are ready,
//! 4. [`Runtime::release`] runs whatever is still pending, then unregisters
//!    the buffers and hands the arenas back. Dropping the runtime instead
//!    unregisters them too, but discards pending operations unrun (with a
//!    warning).
//!
//! Each registered buffer sits behind a lock that the executor takes in the
//! declared mode. The dependency graph guarantees those locks are never
//! contended; they only provide the shared mutable access.

mod buffer;
mod executor;
mod graph;

pub use buffer::{AccessMode, BufferHandle, BufferShape, BufferView, expect_buffers};
pub use graph::{OperationKind, TaskId};

use crate::error::{Result, TiledLuError};
use buffer::BufferData;
use graph::TaskGraph;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

/// Counters collected over the lifetime of a runtime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Operations submitted
    pub submitted: usize,
    /// Operations that ran to completion
    pub executed: usize,
    /// Number of `wait_for_all` calls that had work to do
    pub synchronizations: usize,
    /// Completed operations per kind
    pub per_kind: BTreeMap<OperationKind, usize>,
}

/// Build a worker pool with `threads` workers (0 = one per core).
pub fn build_pool(threads: usize) -> Result<Arc<ThreadPool>> {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("tiled-lu-{i}"))
        .build()
        .map(Arc::new)
        .map_err(|err| TiledLuError::SchedulerResource {
            reason: format!("failed to build worker pool: {err}"),
        })
}

/// Dependency-tracking task runtime borrowing buffers for lifetime `'a`.
pub struct Runtime<'a, T> {
    pool: Arc<ThreadPool>,
    buffers: Vec<RwLock<BufferData<'a, T>>>,
    graph: TaskGraph<'a, T>,
    stats: RuntimeStats,
}

impl<'a, T: Send + Sync> Runtime<'a, T> {
    /// Start a runtime with its own pool of `threads` workers (0 = all cores).
    pub fn new(threads: usize) -> Result<Self> {
        Ok(Self::with_pool(build_pool(threads)?))
    }

    /// Start a runtime on an existing worker pool.
    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        Self {
            pool,
            buffers: Vec::new(),
            graph: TaskGraph::new(),
            stats: RuntimeStats::default(),
        }
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn stats(&self) -> &RuntimeStats {
        &self.stats
    }

    /// Register a writable value buffer.
    pub fn register_values(&mut self, values: &'a mut [T], shape: BufferShape) -> Result<BufferHandle> {
        check_shape(values.len(), shape)?;
        Ok(self.push_buffer(BufferData::Values(values)))
    }

    /// Register a value buffer that operations may only read.
    pub fn register_shared(&mut self, values: &'a [T], shape: BufferShape) -> Result<BufferHandle> {
        check_shape(values.len(), shape)?;
        Ok(self.push_buffer(BufferData::Shared(values)))
    }

    /// Register a writable pivot list.
    pub fn register_pivots(&mut self, pivots: &'a mut [usize]) -> BufferHandle {
        self.push_buffer(BufferData::Pivots(pivots))
    }

    /// Register a pivot list that operations may only read.
    pub fn register_shared_pivots(&mut self, pivots: &'a [usize]) -> BufferHandle {
        self.push_buffer(BufferData::SharedPivots(pivots))
    }

    fn push_buffer(&mut self, data: BufferData<'a, T>) -> BufferHandle {
        self.buffers.push(RwLock::new(data));
        BufferHandle(self.buffers.len() - 1)
    }

    /// Submit an operation.
    ///
    /// `kernel` receives one [`BufferView`] per entry of `accesses`, in the
    /// same order. It runs once every earlier operation it conflicts with
    /// has completed.
    pub fn submit<F>(
        &mut self,
        label: impl Into<String>,
        kind: OperationKind,
        accesses: &[(BufferHandle, AccessMode)],
        kernel: F,
    ) -> Result<TaskId>
    where
        F: for<'v, 'g> FnOnce(&'v mut [BufferView<'g, T>]) -> Result<()> + Send + 'a,
    {
        let label = label.into();
        let mut seen = HashSet::with_capacity(accesses.len());
        for &(handle, mode) in accesses {
            let Some(lock) = self.buffers.get(handle.0) else {
                return Err(invalid(&label, format!("unknown buffer {}", handle.0)));
            };
            if !seen.insert(handle) {
                return Err(invalid(&label, format!("buffer {} listed twice", handle.0)));
            }
            if mode.writes() {
                let shared = lock.read().map(|data| data.is_shared()).unwrap_or(true);
                if shared {
                    return Err(invalid(&label, format!("buffer {} is read-only", handle.0)));
                }
            }
        }

        self.stats.submitted += 1;
        Ok(self
            .graph
            .push(label, kind, accesses.to_vec(), Box::new(kernel)))
    }

    /// Dependencies derived for an operation that has not run yet.
    pub fn dependencies(&self, id: TaskId) -> Option<Vec<TaskId>> {
        self.graph.dependencies(id)
    }

    /// Number of submitted operations that have not run yet
    pub fn pending(&self) -> usize {
        self.graph.len()
    }

    /// Run every submitted operation and wait for completion.
    pub fn wait_for_all(&mut self) -> Result<()> {
        let batch = self.graph.take_batch();
        if batch.is_empty() {
            return Ok(());
        }
        log::trace!("synchronizing {} operations", batch.len());

        let report = executor::execute(&self.pool, &self.buffers, batch)?;
        self.stats.synchronizations += 1;
        self.stats.executed += report.executed.len();
        for kind in report.executed {
            *self.stats.per_kind.entry(kind).or_default() += 1;
        }
        Ok(())
    }

    /// Wait for pending operations, then unregister every buffer.
    pub fn release(mut self) -> Result<RuntimeStats> {
        self.wait_for_all()?;
        Ok(std::mem::take(&mut self.stats))
    }
}

impl<T> Drop for Runtime<'_, T> {
    fn drop(&mut self) {
        let pending = self.graph.len();
        if pending > 0 {
            log::warn!("runtime dropped with {pending} pending operations; they will not run");
        }
    }
}

fn check_shape(len: usize, shape: BufferShape) -> Result<()> {
    if len != shape.len() {
        return Err(TiledLuError::dimension("registered buffer", shape.len(), len));
    }
    Ok(())
}

fn invalid(operation: &str, reason: String) -> TiledLuError {
    TiledLuError::InvalidAccess {
        operation: operation.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_one<'v, 'g>(buffers: &'v mut [BufferView<'g, f64>]) -> Result<()> {
        let [target] = expect_buffers::<f64, 1>(buffers)?;
        for v in target.values_mut()? {
            *v += 1.0;
        }
        Ok(())
    }

    #[test]
    fn test_chain_runs_in_submission_order() {
        let mut data = vec![1.0_f64; 4];
        let mut rt = Runtime::new(2).unwrap();
        let h = rt
            .register_values(&mut data, BufferShape::Vector { len: 4 })
            .unwrap();

        rt.submit("double", OperationKind::TrailingUpdate, &[(h, AccessMode::ReadWrite)], |b| {
            let [target] = expect_buffers::<f64, 1>(b)?;
            for v in target.values_mut()? {
                *v *= 2.0;
            }
            Ok(())
        })
        .unwrap();
        rt.submit("add", OperationKind::TrailingUpdate, &[(h, AccessMode::ReadWrite)], add_one)
            .unwrap();

        let stats = rt.release().unwrap();
        assert_eq!(stats.executed, 2);
        assert_eq!(data, vec![3.0; 4]);
    }

    #[test]
    fn test_rejects_write_to_shared_buffer() {
        let data = vec![0.0_f64; 2];
        let mut rt = Runtime::new(1).unwrap();
        let h = rt
            .register_shared(&data, BufferShape::Vector { len: 2 })
            .unwrap();

        let err = rt
            .submit("write", OperationKind::ForwardSolve, &[(h, AccessMode::Write)], add_one)
            .unwrap_err();
        assert!(matches!(err, TiledLuError::InvalidAccess { .. }));
    }

    #[test]
    fn test_rejects_duplicate_and_unknown_buffers() {
        let mut data = vec![0.0_f64; 2];
        let mut rt = Runtime::new(1).unwrap();
        let h = rt
            .register_values(&mut data, BufferShape::Vector { len: 2 })
            .unwrap();

        let dup = rt.submit(
            "dup",
            OperationKind::ForwardUpdate,
            &[(h, AccessMode::Read), (h, AccessMode::ReadWrite)],
            |_| Ok(()),
        );
        assert!(dup.unwrap_err().is_scheduler_error());

        let unknown = rt.submit(
            "unknown",
            OperationKind::ForwardUpdate,
            &[(BufferHandle(7), AccessMode::Read)],
            |_| Ok(()),
        );
        assert!(unknown.is_err());
        assert_eq!(rt.pending(), 0);
    }

    #[test]
    fn test_register_checks_shape() {
        let mut data = vec![0.0_f64; 3];
        let mut rt = Runtime::new(1).unwrap();
        let err = rt
            .register_values(&mut data, BufferShape::Matrix { rows: 2, cols: 2 })
            .unwrap_err();
        assert!(err.is_dimension_error());
    }

    #[test]
    fn test_first_error_stops_successors() {
        let mut a = vec![0.0_f64; 1];
        let mut rt = Runtime::new(2).unwrap();
        let h = rt
            .register_values(&mut a, BufferShape::Vector { len: 1 })
            .unwrap();

        rt.submit("fail", OperationKind::FactorizeDiagonal, &[(h, AccessMode::ReadWrite)], |_| {
            Err(TiledLuError::SingularTile {
                row: 0,
                col: 0,
                column: 0,
            })
        })
        .unwrap();
        rt.submit("after", OperationKind::TrailingUpdate, &[(h, AccessMode::ReadWrite)], add_one)
            .unwrap();

        let err = rt.wait_for_all().unwrap_err();
        assert!(err.is_singular());
        assert_eq!(rt.stats().executed, 0);
        drop(rt);
        assert_eq!(a, vec![0.0]);
    }

    #[test]
    fn test_independent_operations_all_run() {
        let mut data = vec![0.0_f64; 64];
        let mut rt = Runtime::new(4).unwrap();
        let handles: Vec<_> = data
            .chunks_exact_mut(8)
            .map(|chunk| rt.register_values(chunk, BufferShape::Vector { len: 8 }))
            .collect::<Result<_>>()
            .unwrap();

        for &h in &handles {
            rt.submit("add", OperationKind::TrailingUpdate, &[(h, AccessMode::ReadWrite)], add_one)
                .unwrap();
        }
        let stats = rt.release().unwrap();
        assert_eq!(stats.per_kind[&OperationKind::TrailingUpdate], 8);
        assert!(data.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_drop_discards_pending_operations() {
        let mut data = vec![0.0_f64; 2];
        {
            let mut rt = Runtime::new(1).unwrap();
            let h = rt
                .register_values(&mut data, BufferShape::Vector { len: 2 })
                .unwrap();
            rt.submit("add", OperationKind::TrailingUpdate, &[(h, AccessMode::ReadWrite)], add_one)
                .unwrap();
            assert_eq!(rt.pending(), 1);
        }
        assert_eq!(data, vec![0.0; 2]);
    }

    #[test]
    fn test_pivot_buffers() {
        let mut pivots = vec![0usize; 3];
        let mut values = vec![1.0_f64, 2.0, 3.0];
        let mut rt = Runtime::new(1).unwrap();
        let p = rt.register_pivots(&mut pivots);
        let v = rt
            .register_values(&mut values, BufferShape::Vector { len: 3 })
            .unwrap();

        let writer = rt
            .submit("pivots", OperationKind::FactorizeDiagonal, &[(p, AccessMode::Write)], |b| {
                let [p] = expect_buffers::<f64, 1>(b)?;
                p.pivots_mut()?.copy_from_slice(&[2, 1, 2]);
                Ok(())
            })
            .unwrap();
        let reader = rt
            .submit(
                "reverse",
                OperationKind::ForwardSolve,
                &[(p, AccessMode::Read), (v, AccessMode::ReadWrite)],
                |b| {
                    let [p, v] = expect_buffers::<f64, 2>(b)?;
                    let values = v.values_mut()?;
                    for (i, &r) in p.pivots()?.iter().enumerate() {
                        values.swap(i, r);
                    }
                    Ok(())
                },
            )
            .unwrap();
        assert_eq!(rt.dependencies(reader).unwrap(), vec![writer]);

        rt.release().unwrap();
        assert_eq!(values, vec![3.0, 2.0, 1.0]);
    }
}
