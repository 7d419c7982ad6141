//! Demand-paging fill worker.
//!
//! Tasks that fault on an unmapped page are blocked and queued by priority. A single worker pulls
//! the most urgent one, asks the architecture [`FillBackend`] for a page, fills it (blocking, or
//! asynchronously with a [`Completion`]), and resumes the task. While it serves a fill the worker
//! runs at the priority of the most urgent task it is serving or about to serve, and drops back to
//! its baseline once nothing is queued.
//!
//! Every failure to fill is unrecoverable and surfaces as [`PagerFatal`] from [`Worker::run`].

use std::sync::{Arc, OnceLock};

mod backend;
mod clock;
mod completion;
mod config;
pub mod critical;
mod error;
mod handle;
mod priority;
mod register;
mod sched;
mod signal;
mod stats;
mod task;
mod waitq;
mod worker;

pub use backend::{Blocking, BlockingFill, FillBackend, FillError, FillStatus, PageHandle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use completion::{normalize, Completion};
pub use config::{ConfigError, PagerConfig, DEFAULT_WORK_PERIOD};
pub use error::PagerFatal;
pub use handle::PagerHandle;
pub use priority::{Priority, MAX_PRIORITY, MIN_PRIORITY};
pub use register::{RegisterKind, ResultRegister};
pub use sched::{HostScheduler, Scheduler};
pub use signal::{WakeReason, WorkerSignal};
pub use stats::FillStats;
pub use task::{Task, TaskId, TaskRef, TaskState};
pub use waitq::WaitQueue;
pub use worker::{Worker, WorkerState};

static PAGER: OnceLock<PagerHandle> = OnceLock::new();

/// Register `handle` as the process-wide pager reached by [`pg_miss`].
pub fn install(handle: PagerHandle) -> Result<(), PagerFatal> {
    PAGER.set(handle).map_err(|_| PagerFatal::AlreadyInstalled)
}

pub fn installed() -> Option<&'static PagerHandle> {
    PAGER.get()
}

/// Page miss entry for fault handlers: block `task` until the installed pager fills its page.
pub fn pg_miss(task: &TaskRef) -> Result<(), PagerFatal> {
    PAGER.get().ok_or(PagerFatal::NotInstalled)?.page_miss(task)
}

/// Build the pager, install it process-wide, and hand back its worker.
pub fn init_pager<B: FillBackend>(
    config: PagerConfig,
    sched: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    backend: B,
) -> Result<Worker<B>, PagerFatal> {
    let handle = PagerHandle::new(config, sched, clock)?;
    install(handle.clone())?;
    tracing::debug!("pager installed");
    Ok(Worker::new(handle, backend))
}
