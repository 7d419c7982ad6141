//! Architecture fill backend seam.
//!
//! A backend decides whether a fault is already resolved, finds (or evicts) a physical page, and
//! fills it. Asynchronous backends implement [`FillBackend`] directly and report the outcome
//! through the [`Completion`] they are handed. Backends whose fill blocks until done implement
//! [`BlockingFill`] and are wrapped in [`Blocking`], which reports the outcome inline so the
//! worker's state machine is the same for both.

use std::fmt::Display;

use crate::{completion::Completion, task::TaskRef};

/// Virtual address of a page handed out by [`FillBackend::alloc_page`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageHandle(usize);

impl PageHandle {
    pub const fn new(vaddr: usize) -> Self {
        Self(vaddr)
    }

    pub fn vaddr(&self) -> usize {
        self.0
    }
}

impl Display for PageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FillError {
    /// Reserved for "no result yet". Not a legal fill outcome.
    #[error("operation in progress")]
    Busy,
    #[error("operation not supported")]
    Unsupported,
    #[error("I/O error reading backing store")]
    Io,
    #[error("out of memory")]
    NoMemory,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("backend error code {0}")]
    Other(i32),
}

pub type FillStatus = Result<(), FillError>;

pub trait FillBackend {
    /// Returns true if the task's faulting page is already mapped.
    fn check_mapping(&mut self, task: &TaskRef) -> bool;

    /// Obtain a page for the task's fill, evicting an in-use page if necessary.
    fn alloc_page(&mut self, task: &TaskRef) -> Result<PageHandle, FillError>;

    /// Start filling `page` for `task`. Must report the outcome through `done` exactly once, either
    /// before returning or later from any context. An `Err` return means the fill never started.
    fn fill_page(
        &mut self,
        task: &TaskRef,
        page: PageHandle,
        done: Completion,
    ) -> Result<(), FillError>;

    /// True if [`FillBackend::fill_page`] always reports before it returns.
    fn is_blocking(&self) -> bool {
        false
    }
}

pub trait BlockingFill {
    fn check_mapping(&mut self, task: &TaskRef) -> bool;

    fn alloc_page(&mut self, task: &TaskRef) -> Result<PageHandle, FillError>;

    /// Fill `page` for `task`, returning once the fill is done.
    fn fill_page_blocking(&mut self, task: &TaskRef, page: PageHandle) -> FillStatus;
}

/// Adapter running a [`BlockingFill`] backend behind the asynchronous interface.
pub struct Blocking<B>(pub B);

impl<B> Blocking<B> {
    pub fn into_inner(self) -> B {
        self.0
    }

    pub fn inner(&self) -> &B {
        &self.0
    }
}

impl<B: BlockingFill> FillBackend for Blocking<B> {
    fn check_mapping(&mut self, task: &TaskRef) -> bool {
        self.0.check_mapping(task)
    }

    fn alloc_page(&mut self, task: &TaskRef) -> Result<PageHandle, FillError> {
        self.0.alloc_page(task)
    }

    fn fill_page(
        &mut self,
        task: &TaskRef,
        page: PageHandle,
        done: Completion,
    ) -> Result<(), FillError> {
        let status = self.0.fill_page_blocking(task, page);
        done.complete_inline(status);
        Ok(())
    }

    fn is_blocking(&self) -> bool {
        true
    }
}
