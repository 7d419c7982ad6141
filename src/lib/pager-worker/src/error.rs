//! Unrecoverable pager conditions.

use miette::Diagnostic;
use thiserror::Error;

use crate::{backend::FillError, config::ConfigError, task::TaskId};

/// A failure the pager cannot recover from. The faulted task cannot continue and there is no
/// safe way to unwind its fault, so whoever runs the worker must halt or restart the system.
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
pub enum PagerFatal {
    #[error("page fill for {task} failed: {error}")]
    #[diagnostic(code(pager::fill_failed))]
    FillFailed { task: TaskId, error: FillError },

    #[error("page allocation for {task} failed: {error}")]
    #[diagnostic(
        code(pager::alloc_failed),
        help("page allocation must evict rather than fail")
    )]
    AllocFailed { task: TaskId, error: FillError },

    #[error("could not start page fill for {task}: {error}")]
    #[diagnostic(code(pager::start_failed))]
    StartFailed { task: TaskId, error: FillError },

    #[error("page fill for {task} timed out after {elapsed} ticks (limit {bound})")]
    #[diagnostic(code(pager::timeout))]
    Timeout { task: TaskId, elapsed: u64, bound: u64 },

    #[error("fill result arrived with no pending fill")]
    #[diagnostic(code(pager::no_pending))]
    CompletedWithoutPending,

    #[error("page fault in the fill worker")]
    #[diagnostic(
        code(pager::worker_faulted),
        help("the fill worker and the completion path must be resident")
    )]
    WorkerFaulted,

    #[error("no pager installed")]
    #[diagnostic(code(pager::not_installed))]
    NotInstalled,

    #[error("pager already installed")]
    #[diagnostic(code(pager::installed))]
    AlreadyInstalled,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

impl PagerFatal {
    pub fn task(&self) -> Option<TaskId> {
        match self {
            Self::FillFailed { task, .. }
            | Self::AllocFailed { task, .. }
            | Self::StartFailed { task, .. }
            | Self::Timeout { task, .. } => Some(*task),
            _ => None,
        }
    }
}
