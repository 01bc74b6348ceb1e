//! Dataflow execution of a batch of operations on the worker pool
//!
//! Operations with no pending dependency are spawned immediately. When an
//! operation finishes it decrements the counters of its successors and
//! spawns those that reach zero. The first failure stops all further
//! spawning; operations already running are allowed to finish.

use super::buffer::{BufferData, BufferGuard};
use super::graph::{OperationKind, Task};
use crate::error::{Result, TiledLuError};
use rayon::ThreadPool;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

/// Outcome of a successfully executed batch
#[derive(Debug, Default)]
pub(crate) struct BatchReport {
    pub(crate) executed: Vec<OperationKind>,
}

struct ExecState<'s, 'a, T> {
    buffers: &'s [RwLock<BufferData<'a, T>>],
    slots: Vec<Mutex<Option<Task<'a, T>>>>,
    successors: Vec<Vec<usize>>,
    remaining: Vec<AtomicUsize>,
    failed: AtomicBool,
    first_error: Mutex<Option<TiledLuError>>,
    executed: Mutex<Vec<OperationKind>>,
}

pub(crate) fn execute<'a, T: Send + Sync>(
    pool: &ThreadPool,
    buffers: &[RwLock<BufferData<'a, T>>],
    tasks: Vec<Task<'a, T>>,
) -> Result<BatchReport> {
    if tasks.is_empty() {
        return Ok(BatchReport::default());
    }

    let mut successors = vec![Vec::new(); tasks.len()];
    let mut remaining = Vec::with_capacity(tasks.len());
    let mut roots = Vec::new();
    for (id, task) in tasks.iter().enumerate() {
        for &dep in &task.dependencies {
            successors[dep].push(id);
        }
        if task.dependencies.is_empty() {
            roots.push(id);
        }
        remaining.push(AtomicUsize::new(task.dependencies.len()));
    }

    let state = ExecState {
        buffers,
        slots: tasks.into_iter().map(|t| Mutex::new(Some(t))).collect(),
        successors,
        remaining,
        failed: AtomicBool::new(false),
        first_error: Mutex::new(None),
        executed: Mutex::new(Vec::new()),
    };

    pool.scope(|scope| {
        for &id in &roots {
            spawn(scope, &state, id);
        }
    });

    if let Some(err) = state.first_error.into_inner().map_err(poisoned)? {
        return Err(err);
    }
    let executed = state.executed.into_inner().map_err(poisoned)?;
    Ok(BatchReport { executed })
}

fn spawn<'scope, 'a: 'scope, T: Send + Sync>(
    scope: &rayon::Scope<'scope>,
    state: &'scope ExecState<'scope, 'a, T>,
    id: usize,
) {
    scope.spawn(move |scope| {
        if state.failed.load(Ordering::Acquire) {
            return;
        }
        match state.run(id) {
            Ok(()) => {
                for &next in &state.successors[id] {
                    if state.remaining[next].fetch_sub(1, Ordering::AcqRel) == 1 {
                        spawn(scope, state, next);
                    }
                }
            }
            Err(err) => state.fail(err),
        }
    });
}

impl<T> ExecState<'_, '_, T> {
    fn run(&self, id: usize) -> Result<()> {
        let task = self.slots[id]
            .lock()
            .map_err(poisoned)?
            .take()
            .ok_or_else(|| TiledLuError::SchedulerResource {
                reason: format!("operation #{id} scheduled twice"),
            })?;

        let mut guards = Vec::with_capacity(task.accesses.len());
        for &(handle, mode) in &task.accesses {
            let lock = &self.buffers[handle.0];
            let guard = if mode.writes() {
                BufferGuard::Write(lock.write().map_err(poisoned)?)
            } else {
                BufferGuard::Read(lock.read().map_err(poisoned)?)
            };
            guards.push(guard);
        }
        let mut views: Vec<_> = guards.iter_mut().map(BufferGuard::view).collect();

        log::trace!("running {} [{}]", task.label, task.kind);
        (task.kernel)(&mut views[..]).map_err(|err| {
            log::error!("operation '{}' failed: {err}", task.label);
            err
        })?;

        self.executed.lock().map_err(poisoned)?.push(task.kind);
        Ok(())
    }

    fn fail(&self, err: TiledLuError) {
        self.failed.store(true, Ordering::Release);
        if let Ok(mut slot) = self.first_error.lock() {
            if slot.is_none() {
                *slot = Some(err);
            }
        }
    }
}

fn poisoned<E>(_: E) -> TiledLuError {
    TiledLuError::SchedulerResource {
        reason: "buffer lock poisoned by a panicking operation".to_string(),
    }
}
