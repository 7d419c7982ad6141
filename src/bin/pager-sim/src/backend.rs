//! Simulated fill backends. A "page" is a slot index; tasks that share a slot share a mapping,
//! so once one of them is filled the rest are found already mapped.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use pager_worker::{
    BlockingFill, Completion, FillBackend, FillError, FillStatus, PageHandle, TaskId, TaskRef,
};

const PAGE_SIZE: usize = 4096;

#[derive(Clone, Default)]
pub struct PageTable {
    slots: HashMap<TaskId, usize>,
    mapped: Arc<Mutex<HashSet<usize>>>,
}

impl PageTable {
    pub fn assign(&mut self, task: TaskId, slot: usize) {
        self.slots.insert(task, slot);
    }

    fn slot(&self, task: &TaskRef) -> Result<usize, FillError> {
        self.slots
            .get(&task.id())
            .copied()
            .ok_or(FillError::InvalidArgument)
    }

    fn is_mapped(&self, task: &TaskRef) -> bool {
        let Ok(slot) = self.slot(task) else {
            return false;
        };
        self.mapped.lock().is_ok_and(|m| m.contains(&slot))
    }

    fn map(&self, page: PageHandle) -> FillStatus {
        let mut mapped = self.mapped.lock().map_err(|_| FillError::Other(-1))?;
        mapped.insert(page.vaddr() / PAGE_SIZE);
        Ok(())
    }

    fn page_for(&self, task: &TaskRef) -> Result<PageHandle, FillError> {
        Ok(PageHandle::new(self.slot(task)? * PAGE_SIZE))
    }

    pub fn mapped_count(&self) -> usize {
        self.mapped.lock().map(|m| m.len()).unwrap_or(0)
    }
}

/// Completes every fill from a fresh thread after `latency`, standing in for a DMA engine.
pub struct SimAsync {
    pub pages: PageTable,
    pub latency: Duration,
}

impl FillBackend for SimAsync {
    fn check_mapping(&mut self, task: &TaskRef) -> bool {
        self.pages.is_mapped(task)
    }

    fn alloc_page(&mut self, task: &TaskRef) -> Result<PageHandle, FillError> {
        self.pages.page_for(task)
    }

    fn fill_page(
        &mut self,
        task: &TaskRef,
        page: PageHandle,
        done: Completion,
    ) -> Result<(), FillError> {
        let pages = self.pages.clone();
        let latency = self.latency;
        tracing::trace!("{}: async fill of {} started", task, page);
        std::thread::Builder::new()
            .name(format!("fill-{}", task.id().raw()))
            .spawn(move || {
                std::thread::sleep(latency);
                done.complete(pages.map(page));
            })
            .map_err(|_| FillError::NoMemory)?;
        Ok(())
    }
}

/// Fills on the worker thread, sleeping `latency` per page.
pub struct SimBlocking {
    pub pages: PageTable,
    pub latency: Duration,
}

impl BlockingFill for SimBlocking {
    fn check_mapping(&mut self, task: &TaskRef) -> bool {
        self.pages.is_mapped(task)
    }

    fn alloc_page(&mut self, task: &TaskRef) -> Result<PageHandle, FillError> {
        self.pages.page_for(task)
    }

    fn fill_page_blocking(&mut self, task: &TaskRef, page: PageHandle) -> FillStatus {
        tracing::trace!("{}: blocking fill of {}", task, page);
        std::thread::sleep(self.latency);
        self.pages.map(page)
    }
}
