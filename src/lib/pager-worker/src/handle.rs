use std::sync::Arc;

use crate::{
    clock::Clock,
    config::PagerConfig,
    critical::IrqLock,
    error::PagerFatal,
    priority::Priority,
    register::ResultRegister,
    sched::Scheduler,
    signal::WorkerSignal,
    stats::{bump, FillStats, StatCounters},
    task::{TaskRef, TaskState},
    waitq::WaitQueue,
};

pub(crate) struct PagerState {
    pub waitq: WaitQueue,
    /// The task whose fill is in flight. Never also on `waitq`.
    pub pending: Option<TaskRef>,
}

pub(crate) struct PagerShared {
    pub state: IrqLock<PagerState>,
    pub register: ResultRegister,
    pub signal: WorkerSignal,
    pub sched: Arc<dyn Scheduler>,
    pub clock: Arc<dyn Clock>,
    pub config: PagerConfig,
    pub stats: StatCounters,
}

impl PagerShared {
    /// Raise the worker to `priority` if it is currently running lower. Must be called inside the
    /// state critical section.
    pub fn boost_worker(&self, priority: Priority) -> bool {
        let worker = self.sched.worker();
        if priority > worker.priority() {
            tracing::debug!("boosting pager worker {} -> {}", worker.priority(), priority);
            self.sched.set_priority(&worker, priority);
            bump(&self.stats.priority_boosts);
            true
        } else {
            false
        }
    }
}

/// Entry point for the fault path: lets fault handlers queue blocked tasks and wake the worker.
#[derive(Clone)]
pub struct PagerHandle {
    shared: Arc<PagerShared>,
}

impl PagerHandle {
    pub fn new(
        config: PagerConfig,
        sched: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PagerFatal> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(PagerShared {
                state: IrqLock::new(PagerState {
                    waitq: WaitQueue::new(),
                    pending: None,
                }),
                register: ResultRegister::new(config.register),
                signal: WorkerSignal::new(),
                sched,
                clock,
                config,
                stats: StatCounters::default(),
            }),
        })
    }

    pub(crate) fn shared(&self) -> &Arc<PagerShared> {
        &self.shared
    }

    pub fn config(&self) -> &PagerConfig {
        &self.shared.config
    }

    /// Queue a task that is already blocked on a fill. Does not wake the worker.
    pub fn enqueue_waiting(&self, task: TaskRef) {
        self.shared.state.lock().waitq.enqueue(task);
    }

    /// Handle a page miss for `task`: block it, queue it, make sure the worker runs at least at
    /// its priority, and wake the worker.
    pub fn page_miss(&self, task: &TaskRef) -> Result<(), PagerFatal> {
        let shared = &self.shared;
        // The worker and everything it touches must stay resident.
        if task.id() == shared.sched.worker().id() {
            return Err(PagerFatal::WorkerFaulted);
        }

        tracing::trace!("{}: page miss", task);
        bump(&shared.stats.faults);
        {
            let mut state = shared.state.lock();
            shared.sched.block(task, TaskState::BlockedOnFill);
            state.waitq.enqueue(task.clone());
            shared.boost_worker(task.priority());
        }
        shared.signal.raise();
        Ok(())
    }

    pub fn signal(&self) {
        self.shared.signal.raise();
    }

    pub fn pending(&self) -> Option<TaskRef> {
        self.shared.state.lock().pending.clone()
    }

    pub fn waiting(&self) -> Vec<TaskRef> {
        self.shared.state.lock().waitq.iter().cloned().collect()
    }

    pub fn waiting_len(&self) -> usize {
        self.shared.state.lock().waitq.len()
    }

    pub fn worker_priority(&self) -> Priority {
        self.shared.sched.worker().priority()
    }

    pub fn stats(&self) -> FillStats {
        self.shared.stats.snapshot()
    }

    /// True while no task is queued or being filled.
    pub fn is_quiescent(&self) -> bool {
        let state = self.shared.state.lock();
        state.waitq.is_empty() && state.pending.is_none()
    }
}
