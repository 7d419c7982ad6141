#![allow(dead_code)]

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use pager_worker::{
    critical, BlockingFill, Completion, FillBackend, FillError, FillStatus, HostScheduler,
    ManualClock, PageHandle, PagerConfig, PagerHandle, Priority, TaskId, TaskRef, Worker,
};

pub const PAGE: usize = 4096;

/// Asynchronous backend that parks each completion until the test finishes it.
#[derive(Default)]
pub struct MockBackend {
    pub mapped: HashSet<TaskId>,
    pub inflight: VecDeque<(TaskRef, PageHandle, Completion)>,
    pub filled: Vec<TaskId>,
    pub fail_alloc: Option<FillError>,
    pub fail_start: Option<FillError>,
    pub unmasked_calls: usize,
    next_page: usize,
}

impl MockBackend {
    fn note_mask(&mut self) {
        if !critical::is_disabled() {
            self.unmasked_calls += 1;
        }
    }

    /// Deliver the oldest outstanding completion.
    pub fn finish(&mut self, status: FillStatus) -> TaskRef {
        let (task, _, done) = self
            .inflight
            .pop_front()
            .expect("no fill in flight");
        done.complete(status);
        task
    }
}

impl FillBackend for MockBackend {
    fn check_mapping(&mut self, task: &TaskRef) -> bool {
        self.note_mask();
        self.mapped.contains(&task.id())
    }

    fn alloc_page(&mut self, _task: &TaskRef) -> Result<PageHandle, FillError> {
        self.note_mask();
        if let Some(e) = self.fail_alloc {
            return Err(e);
        }
        self.next_page += 1;
        Ok(PageHandle::new(self.next_page * PAGE))
    }

    fn fill_page(
        &mut self,
        task: &TaskRef,
        page: PageHandle,
        done: Completion,
    ) -> Result<(), FillError> {
        self.note_mask();
        if let Some(e) = self.fail_start {
            return Err(e);
        }
        self.filled.push(task.id());
        self.inflight.push_back((task.clone(), page, done));
        Ok(())
    }
}

/// Blocking backend that returns scripted statuses, success once the script runs out.
#[derive(Default)]
pub struct MockBlocking {
    pub mapped: HashSet<TaskId>,
    pub script: VecDeque<FillStatus>,
    pub filled: Vec<TaskId>,
    next_page: usize,
}

impl BlockingFill for MockBlocking {
    fn check_mapping(&mut self, task: &TaskRef) -> bool {
        self.mapped.contains(&task.id())
    }

    fn alloc_page(&mut self, _task: &TaskRef) -> Result<PageHandle, FillError> {
        self.next_page += 1;
        Ok(PageHandle::new(self.next_page * PAGE))
    }

    fn fill_page_blocking(&mut self, task: &TaskRef, _page: PageHandle) -> FillStatus {
        self.filled.push(task.id());
        self.script.pop_front().unwrap_or(Ok(()))
    }
}

pub struct Rig<B> {
    pub worker: Worker<B>,
    pub sched: Arc<HostScheduler>,
    pub clock: Arc<ManualClock>,
}

impl<B: FillBackend> Rig<B> {
    pub fn new(config: PagerConfig, backend: B) -> Self {
        let sched = Arc::new(HostScheduler::new(config.default_priority));
        let clock = Arc::new(ManualClock::new(0));
        let handle = PagerHandle::new(config, sched.clone(), clock.clone()).unwrap();
        Self {
            worker: Worker::new(handle, backend),
            sched,
            clock,
        }
    }

    pub fn handle(&self) -> &PagerHandle {
        self.worker.handle()
    }

    pub fn worker_priority(&self) -> Priority {
        self.handle().worker_priority()
    }
}

pub fn baseline(pri: u8) -> PagerConfig {
    PagerConfig::default().with_default_priority(Priority::new(pri))
}
