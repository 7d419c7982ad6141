use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
};

use crate::priority::Priority;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task:{}", self.0)
    }
}

#[derive(PartialEq, Copy, Clone, Debug)]
#[repr(u32)]
pub enum TaskState {
    Ready,
    /// Parked on the wait queue until its page is filled.
    BlockedOnFill,
    /// Owned by the fill worker while its fill is in flight. Not on any list.
    InTransit,
}

impl TaskState {
    fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Ready,
            1 => Self::BlockedOnFill,
            _ => Self::InTransit,
        }
    }
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Control block for a schedulable entity. Owned by the host scheduler; the pager only holds
/// references.
#[derive(Debug)]
pub struct Task {
    id: TaskId,
    name: String,
    priority: AtomicU32,
    state: AtomicU32,
}

pub type TaskRef = Arc<Task>;

impl Task {
    pub fn new(name: impl Into<String>, priority: Priority) -> TaskRef {
        Arc::new(Self {
            id: TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            priority: AtomicU32::new(priority.raw()),
            state: AtomicU32::new(TaskState::Ready as u32),
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> Priority {
        Priority::from_raw(self.priority.load(Ordering::SeqCst))
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_raw(self.state.load(Ordering::SeqCst))
    }

    /// Raw field update for [`crate::Scheduler`] implementations. Does not reschedule.
    pub fn store_priority(&self, priority: Priority) {
        self.priority.store(priority.raw(), Ordering::SeqCst);
    }

    pub fn store_state(&self, state: TaskState) {
        self.state.store(state as u32, Ordering::SeqCst);
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.id, self.name)
    }
}
