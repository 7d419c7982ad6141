use std::{cmp::Reverse, collections::BTreeMap};

use crate::{
    priority::Priority,
    task::{TaskId, TaskRef},
};

// Priority descending, then arrival order.
type WaitKey = (Reverse<Priority>, u64);

/// Tasks blocked waiting for a page fill, highest priority first, FIFO among equals.
///
/// The key captures the task's priority at enqueue time. A task boosted while it waits keeps its
/// place, but [`WaitQueue::head_priority_or`] reports its current priority.
#[derive(Default)]
pub struct WaitQueue {
    queue: BTreeMap<WaitKey, TaskRef>,
    seq: u64,
}

impl WaitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, task: TaskRef) {
        let key = (Reverse(task.priority()), self.seq);
        self.seq += 1;
        self.queue.insert(key, task);
    }

    pub fn remove_first(&mut self) -> Option<TaskRef> {
        self.queue.pop_first().map(|(_, task)| task)
    }

    pub fn head(&self) -> Option<&TaskRef> {
        self.queue.first_key_value().map(|(_, task)| task)
    }

    pub fn head_priority_or(&self, default: Priority) -> Priority {
        self.head().map_or(default, |task| task.priority())
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.queue.values().any(|task| task.id() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskRef> {
        self.queue.values()
    }
}
