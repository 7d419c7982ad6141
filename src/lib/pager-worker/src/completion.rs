//! Completion path for asynchronous fills.
//!
//! The backend reports a fill through the [`Completion`] it was handed, possibly from interrupt
//! context. Besides recording the outcome, completion keeps the worker at the priority of the
//! most urgent task it is serving or about to serve, so a high-priority faulter is never stuck
//! behind a worker that unrelated work can preempt.

use std::sync::Arc;

use crate::{
    backend::{FillError, FillStatus},
    handle::PagerShared,
    priority::Priority,
    stats::bump,
    task::TaskId,
};

/// One-shot report for a single fill.
pub struct Completion {
    shared: Arc<PagerShared>,
    task: TaskId,
}

/// `Busy` is the register's "no result yet"; a backend reporting it gets `Unsupported` instead.
pub fn normalize(status: FillStatus) -> FillStatus {
    match status {
        Err(FillError::Busy) => Err(FillError::Unsupported),
        s => s,
    }
}

impl Completion {
    pub(crate) fn new(shared: Arc<PagerShared>, task: TaskId) -> Self {
        Self { shared, task }
    }

    pub fn task(&self) -> TaskId {
        self.task
    }

    /// Report the outcome of the fill and wake the worker.
    pub fn complete(self, result: FillStatus) {
        let shared = &self.shared;
        {
            let state = shared.state.lock();
            if let Some(pending) = &state.pending {
                if pending.id() != self.task {
                    tracing::warn!(
                        "completion for {} while {} is pending",
                        self.task,
                        pending.id()
                    );
                }
                let target = core::cmp::max(
                    pending.priority(),
                    state.waitq.head_priority_or(Priority::MIN),
                );
                shared.boost_worker(target);

                if result == Err(FillError::Busy) {
                    tracing::warn!("{}: backend reported busy as a fill result", self.task);
                }
                shared.register.store(normalize(result));
            } else {
                tracing::warn!("spurious fill completion for {}", self.task);
                bump(&shared.stats.spurious_callbacks);
            }
        }
        shared.signal.raise();
    }

    /// Record the outcome of a fill that ran on the worker itself. The worker reads the register
    /// straight after, so there is nobody to wake and nothing to boost.
    pub(crate) fn complete_inline(self, result: FillStatus) {
        let _state = self.shared.state.lock();
        self.shared.register.store(normalize(result));
    }
}
