use std::convert::Infallible;

use crate::{
    backend::FillBackend,
    completion::Completion,
    critical,
    error::PagerFatal,
    handle::PagerHandle,
    signal::WakeReason,
    stats::{bump, FillStats},
    task::{TaskRef, TaskState},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// No fill in flight.
    Idle,
    /// A fill is in flight for the pending task.
    Filling,
}

/// The page fill worker. Owns the backend and the fill state machine; everything shared with the
/// fault path and completions lives behind its [`PagerHandle`].
pub struct Worker<B> {
    backend: B,
    handle: PagerHandle,
    state: WorkerState,
    started_at: Option<u64>,
}

impl<B: FillBackend> Worker<B> {
    pub fn new(handle: PagerHandle, backend: B) -> Self {
        Self {
            backend,
            handle,
            state: WorkerState::Idle,
            started_at: None,
        }
    }

    pub fn handle(&self) -> &PagerHandle {
        &self.handle
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn stats(&self) -> FillStats {
        self.handle.stats()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Take the highest-priority waiter and start its fill. Returns true if a fill is now in
    /// flight; false if the queue was empty or the page turned out to be mapped already.
    pub fn start_next_fill(&mut self) -> Result<bool, PagerFatal> {
        let shared = self.handle.shared().clone();
        let task = {
            let mut state = shared.state.lock();
            debug_assert!(state.pending.is_none());
            let Some(task) = state.waitq.remove_first() else {
                return Ok(false);
            };
            state.pending = Some(task.clone());
            shared.sched.block(&task, TaskState::InTransit);
            task
        };

        // Several tasks can fault on the same page before the first fill lands.
        if self.backend.check_mapping(&task) {
            tracing::debug!("{}: page already mapped, resuming", task);
            shared.state.lock().pending = None;
            shared.sched.unblock(&task);
            bump(&shared.stats.already_mapped);
            return Ok(false);
        }

        let page = self
            .backend
            .alloc_page(&task)
            .map_err(|error| PagerFatal::AllocFailed {
                task: task.id(),
                error,
            })?;

        tracing::trace!("{}: filling page {}", task, page);
        self.state = WorkerState::Filling;
        self.started_at = shared.config.timeout_ticks.map(|_| shared.clock.now());
        bump(&shared.stats.fills_started);
        let done = Completion::new(shared.clone(), task.id());
        self.backend
            .fill_page(&task, page, done)
            .map_err(|error| PagerFatal::StartFailed {
                task: task.id(),
                error,
            })?;
        Ok(true)
    }

    /// Resume the task whose fill just finished.
    pub fn complete_pending_fill(&mut self) -> Result<TaskRef, PagerFatal> {
        let shared = self.handle.shared();
        let task = shared
            .state
            .lock()
            .pending
            .take()
            .ok_or(PagerFatal::CompletedWithoutPending)?;
        self.state = WorkerState::Idle;
        self.started_at = None;
        shared.sched.unblock(&task);
        bump(&shared.stats.fills_completed);
        tracing::trace!("{}: fill complete", task);
        Ok(task)
    }

    /// Nothing queued and nothing in flight: drop back to the baseline priority. The queue is
    /// checked under the same guard that lowers the priority, so a fault queued meanwhile keeps
    /// the boost it gave the worker. Returns false, changing nothing, if a task is queued or
    /// pending.
    pub fn go_idle(&mut self) -> bool {
        let shared = self.handle.shared();
        let state = shared.state.lock();
        if !state.waitq.is_empty() || state.pending.is_some() {
            return false;
        }
        self.state = WorkerState::Idle;
        self.started_at = None;

        let worker = shared.sched.worker();
        let baseline = shared.config.default_priority;
        if worker.priority() != baseline {
            shared.sched.set_priority(&worker, baseline);
        }
        drop(state);
        bump(&shared.stats.idle_transitions);
        tracing::debug!("pager idle: {}", shared.stats.snapshot());
        true
    }

    // Start fills until one is in flight or the worker goes idle. Returns true if it went idle.
    fn advance(&mut self) -> Result<bool, PagerFatal> {
        loop {
            if self.start_next_fill()? {
                return Ok(false);
            }
            if self.go_idle() {
                return Ok(true);
            }
        }
    }

    fn check_timeout(&self) -> Result<(), PagerFatal> {
        let shared = self.handle.shared();
        let (Some(bound), Some(start)) = (shared.config.timeout_ticks, self.started_at) else {
            return Ok(());
        };
        let elapsed = shared.clock.now().saturating_sub(start);
        if elapsed >= bound {
            let task = shared
                .state
                .lock()
                .pending
                .as_ref()
                .map(|t| t.id())
                .ok_or(PagerFatal::CompletedWithoutPending)?;
            tracing::error!("{}: page fill timed out after {} ticks", task, elapsed);
            return Err(PagerFatal::Timeout {
                task,
                elapsed,
                bound,
            });
        }
        Ok(())
    }

    fn process_wake(&mut self, reason: WakeReason) -> Result<(), PagerFatal> {
        if reason == WakeReason::TimedOut {
            bump(&self.handle.shared().stats.timed_out_wakes);
        }

        let mut idled = false;
        loop {
            match self.state {
                WorkerState::Filling => {
                    let Some(result) = self.handle.shared().register.take() else {
                        if reason == WakeReason::Signaled {
                            bump(&self.handle.shared().stats.spurious_wakes);
                        }
                        return self.check_timeout();
                    };
                    if let Err(error) = result {
                        let task = self
                            .handle
                            .pending()
                            .map(|t| t.id())
                            .ok_or(PagerFatal::CompletedWithoutPending)?;
                        tracing::error!("{}: page fill failed: {}", task, error);
                        return Err(PagerFatal::FillFailed { task, error });
                    }
                    self.complete_pending_fill()?;
                    idled = self.advance()?;
                }
                WorkerState::Idle => {
                    let empty = self.handle.shared().state.lock().waitq.is_empty();
                    if empty && (!self.backend.is_blocking() || idled || self.go_idle()) {
                        return Ok(());
                    }
                    idled = self.advance()?;
                }
            }

            // Blocking fills finish inside start_next_fill; keep draining in this wake.
            if !self.backend.is_blocking() {
                return Ok(());
            }
        }
    }

    /// Run one wake of the worker loop, without sleeping. The body runs masked.
    pub fn handle_wake(&mut self, reason: WakeReason) -> Result<(), PagerFatal> {
        critical::with_disabled(|| self.process_wake(reason))
    }

    /// The worker loop. Only returns if the pager hits an unrecoverable condition.
    pub fn run(&mut self) -> Result<Infallible, PagerFatal> {
        let period = self.handle.config().work_period;
        tracing::debug!(
            "pager worker started (period {:?}, priority {}, timeout {:?})",
            period,
            self.handle.config().default_priority,
            self.handle.config().timeout_ticks
        );
        loop {
            let reason = self.handle.shared().signal.wait(period);
            self.handle_wake(reason)?;
        }
    }
}
