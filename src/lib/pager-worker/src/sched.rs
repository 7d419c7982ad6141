//! Seam to the host scheduler, and an in-process implementation.

use std::collections::BTreeMap;

use crate::{
    critical::IrqLock,
    priority::Priority,
    task::{Task, TaskId, TaskRef, TaskState},
};

/// The parts of the task scheduler the fill worker depends on.
pub trait Scheduler: Send + Sync {
    /// The fill worker's own schedulable entity.
    fn worker(&self) -> TaskRef;

    fn set_priority(&self, task: &TaskRef, priority: Priority);

    /// Take a task off the ready set and park it in `state`.
    fn block(&self, task: &TaskRef, state: TaskState);

    /// Move a task back to the ready set.
    fn unblock(&self, task: &TaskRef);
}

#[derive(Default)]
struct HostSchedInner {
    ready: Vec<TaskRef>,
    priority_log: BTreeMap<TaskId, Vec<Priority>>,
    unblocks: BTreeMap<TaskId, usize>,
}

/// Scheduler for hosted runs: keeps a ready list and remembers every priority change and
/// every resume, so callers can check what the worker did.
pub struct HostScheduler {
    worker: TaskRef,
    inner: IrqLock<HostSchedInner>,
}

impl HostScheduler {
    pub fn new(worker_priority: Priority) -> Self {
        Self {
            worker: Task::new("pg-worker", worker_priority),
            inner: IrqLock::new(HostSchedInner::default()),
        }
    }

    /// Drain the tasks made ready since the last call.
    pub fn take_ready(&self) -> Vec<TaskRef> {
        core::mem::take(&mut self.inner.lock().ready)
    }

    pub fn ready_count(&self) -> usize {
        self.inner.lock().ready.len()
    }

    pub fn priority_history(&self, id: TaskId) -> Vec<Priority> {
        self.inner
            .lock()
            .priority_log
            .get(&id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn unblock_count(&self, id: TaskId) -> usize {
        self.inner.lock().unblocks.get(&id).copied().unwrap_or(0)
    }
}

impl Scheduler for HostScheduler {
    fn worker(&self) -> TaskRef {
        self.worker.clone()
    }

    fn set_priority(&self, task: &TaskRef, priority: Priority) {
        tracing::trace!("{}: priority {} -> {}", task, task.priority(), priority);
        task.store_priority(priority);
        self.inner
            .lock()
            .priority_log
            .entry(task.id())
            .or_default()
            .push(priority);
    }

    fn block(&self, task: &TaskRef, state: TaskState) {
        tracing::trace!("{}: {:?} -> {:?}", task, task.state(), state);
        let mut inner = self.inner.lock();
        inner.ready.retain(|t| t.id() != task.id());
        task.store_state(state);
    }

    fn unblock(&self, task: &TaskRef) {
        tracing::trace!("{}: {:?} -> Ready", task, task.state());
        let mut inner = self.inner.lock();
        task.store_state(TaskState::Ready);
        *inner.unblocks.entry(task.id()).or_default() += 1;
        inner.ready.push(task.clone());
    }
}
