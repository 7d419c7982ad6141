mod common;

use common::{baseline, MockBackend, Rig};
use pager_worker::{
    FillError, PagerFatal, Priority, RegisterKind, Scheduler, Task, TaskState, WakeReason,
    WorkerState,
};

#[test]
fn fill_completes_and_resumes_task() {
    let mut rig = Rig::new(baseline(50), MockBackend::default());
    let t = Task::new("t", Priority::new(10));

    rig.handle().page_miss(&t).unwrap();
    assert_eq!(t.state(), TaskState::BlockedOnFill);
    assert_eq!(rig.handle().waiting_len(), 1);

    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    assert_eq!(rig.worker.state(), WorkerState::Filling);
    assert_eq!(rig.handle().pending().unwrap().id(), t.id());
    assert_eq!(t.state(), TaskState::InTransit);
    assert_eq!(rig.handle().waiting_len(), 0);

    rig.worker.backend_mut().finish(Ok(()));
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    assert_eq!(t.state(), TaskState::Ready);
    assert_eq!(rig.sched.unblock_count(t.id()), 1);
    assert_eq!(rig.worker.state(), WorkerState::Idle);
    assert!(rig.handle().is_quiescent());
    assert_eq!(rig.worker_priority(), Priority::new(50));
    assert_eq!(rig.worker.backend().unmasked_calls, 0);
}

#[test]
fn higher_priority_waiter_served_first() {
    let mut rig = Rig::new(baseline(50), MockBackend::default());
    let low = Task::new("low", Priority::new(5));
    let high = Task::new("high", Priority::new(20));
    rig.handle().page_miss(&low).unwrap();
    rig.handle().page_miss(&high).unwrap();

    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    rig.worker.backend_mut().finish(Ok(()));
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    rig.worker.backend_mut().finish(Ok(()));
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();

    assert_eq!(rig.worker.backend().filled, vec![high.id(), low.id()]);
    let ready = rig.sched.take_ready();
    assert_eq!(
        ready.iter().map(|t| t.id()).collect::<Vec<_>>(),
        vec![high.id(), low.id()]
    );
}

#[test]
fn next_fill_starts_without_idle() {
    let mut rig = Rig::new(baseline(50), MockBackend::default());
    let a = Task::new("a", Priority::new(10));
    let b = Task::new("b", Priority::new(10));
    rig.handle().page_miss(&a).unwrap();
    rig.handle().page_miss(&b).unwrap();

    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    rig.worker.backend_mut().finish(Ok(()));
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();

    assert_eq!(a.state(), TaskState::Ready);
    assert_eq!(rig.handle().pending().unwrap().id(), b.id());
    assert_eq!(rig.worker.state(), WorkerState::Filling);
    assert_eq!(rig.worker.stats().idle_transitions, 0);
    assert_eq!(rig.worker.stats().fills_started, 2);
}

#[test]
fn completion_boosts_to_queue_head() {
    let mut rig = Rig::new(baseline(5), MockBackend::default());
    let a = Task::new("a", Priority::new(10));
    rig.handle().page_miss(&a).unwrap();
    assert_eq!(rig.worker_priority(), Priority::new(10));
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();

    // Queued without going through the fault path, so only the completion can boost for it.
    let b = Task::new("b", Priority::new(30));
    rig.sched.block(&b, TaskState::BlockedOnFill);
    rig.handle().enqueue_waiting(b.clone());
    assert_eq!(rig.worker_priority(), Priority::new(10));

    rig.worker.backend_mut().finish(Ok(()));
    assert_eq!(rig.worker_priority(), Priority::new(30));

    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    assert_eq!(rig.handle().pending().unwrap().id(), b.id());
    assert_eq!(rig.worker_priority(), Priority::new(30));

    rig.worker.backend_mut().finish(Ok(()));
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    assert_eq!(rig.worker_priority(), Priority::new(5));
}

#[test]
fn completion_boosts_to_raised_waiter() {
    let mut rig = Rig::new(baseline(5), MockBackend::default());
    let a = Task::new("a", Priority::new(10));
    let b = Task::new("b", Priority::new(10));
    rig.handle().page_miss(&a).unwrap();
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    rig.handle().page_miss(&b).unwrap();
    assert_eq!(rig.worker_priority(), Priority::new(10));

    // Another task donates priority to b while it waits.
    rig.sched.set_priority(&b, Priority::new(60));
    rig.worker.backend_mut().finish(Ok(()));
    assert_eq!(rig.worker_priority(), Priority::new(60));
}

#[test]
fn completion_never_lowers_worker() {
    let mut rig = Rig::new(baseline(50), MockBackend::default());
    let t = Task::new("t", Priority::new(10));
    rig.handle().page_miss(&t).unwrap();
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();

    let worker = rig.sched.worker();
    rig.sched.set_priority(&worker, Priority::new(80));
    let before = rig.sched.priority_history(worker.id()).len();
    rig.worker.backend_mut().finish(Ok(()));
    assert_eq!(rig.worker_priority(), Priority::new(80));
    assert_eq!(rig.sched.priority_history(worker.id()).len(), before);
}

#[test]
fn worker_priority_covers_pending_and_head() {
    let mut rig = Rig::new(baseline(1), MockBackend::default());
    let tasks = [12, 40, 7, 25]
        .into_iter()
        .map(|p| Task::new(format!("t{}", p), Priority::new(p)))
        .collect::<Vec<_>>();
    for t in &tasks {
        rig.handle().page_miss(t).unwrap();
    }
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    while rig.handle().pending().is_some() {
        let pending = rig.handle().pending().unwrap();
        let head = rig
            .handle()
            .waiting()
            .first()
            .map(|t| t.priority())
            .unwrap_or(Priority::MIN);
        rig.worker.backend_mut().finish(Ok(()));
        assert!(rig.worker_priority() >= pending.priority().max(head));
        rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    }
    assert_eq!(rig.worker_priority(), Priority::new(1));
    for t in &tasks {
        assert_eq!(rig.sched.unblock_count(t.id()), 1);
    }
}

#[test]
fn pending_task_never_queued() {
    let mut rig = Rig::new(baseline(50), MockBackend::default());
    let tasks = (0..5)
        .map(|i| Task::new(format!("t{}", i), Priority::new(10 + i)))
        .collect::<Vec<_>>();
    for t in &tasks {
        rig.handle().page_miss(t).unwrap();
    }
    loop {
        rig.worker.handle_wake(WakeReason::Signaled).unwrap();
        let Some(pending) = rig.handle().pending() else {
            break;
        };
        assert!(rig.handle().waiting().iter().all(|t| t.id() != pending.id()));
        assert_eq!(rig.worker.backend().inflight.len(), 1);
        rig.worker.backend_mut().finish(Ok(()));
    }
    assert!(rig.handle().is_quiescent());
}

#[test]
fn already_mapped_resumes_without_fill() {
    let mut rig = Rig::new(baseline(50), MockBackend::default());
    let t = Task::new("t", Priority::new(90));
    rig.worker.backend_mut().mapped.insert(t.id());
    rig.handle().page_miss(&t).unwrap();
    assert_eq!(rig.worker_priority(), Priority::new(90));

    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    assert_eq!(t.state(), TaskState::Ready);
    assert!(rig.worker.backend().filled.is_empty());
    assert_eq!(rig.worker.state(), WorkerState::Idle);
    assert_eq!(rig.worker.stats().already_mapped, 1);
    assert_eq!(rig.worker_priority(), Priority::new(50));
}

#[test]
fn already_mapped_moves_on_to_next() {
    let mut rig = Rig::new(baseline(50), MockBackend::default());
    let first = Task::new("first", Priority::new(20));
    let second = Task::new("second", Priority::new(10));
    rig.worker.backend_mut().mapped.insert(first.id());
    rig.handle().page_miss(&first).unwrap();
    rig.handle().page_miss(&second).unwrap();

    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    assert_eq!(first.state(), TaskState::Ready);
    assert_eq!(rig.handle().pending().unwrap().id(), second.id());
    assert_eq!(rig.worker.backend().filled, vec![second.id()]);
}

#[test]
fn busy_result_is_remapped() {
    for kind in [RegisterKind::Channel, RegisterKind::Locked] {
        let mut rig = Rig::new(baseline(50).with_register(kind), MockBackend::default());
        let t = Task::new("t", Priority::new(10));
        rig.handle().page_miss(&t).unwrap();
        rig.worker.handle_wake(WakeReason::Signaled).unwrap();
        rig.worker.backend_mut().finish(Err(FillError::Busy));

        let err = rig.worker.handle_wake(WakeReason::Signaled).unwrap_err();
        assert_eq!(
            err,
            PagerFatal::FillFailed {
                task: t.id(),
                error: FillError::Unsupported
            }
        );
    }
}

#[test]
fn fill_error_is_fatal() {
    let mut rig = Rig::new(baseline(50), MockBackend::default());
    let t = Task::new("t", Priority::new(10));
    rig.handle().page_miss(&t).unwrap();
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    rig.worker.backend_mut().finish(Err(FillError::Io));

    let err = rig.worker.handle_wake(WakeReason::Signaled).unwrap_err();
    assert_eq!(err.task(), Some(t.id()));
    assert!(matches!(
        err,
        PagerFatal::FillFailed {
            error: FillError::Io,
            ..
        }
    ));
    assert_ne!(t.state(), TaskState::Ready);
}

#[test]
fn alloc_and_start_failures_are_fatal() {
    let mut backend = MockBackend::default();
    backend.fail_alloc = Some(FillError::NoMemory);
    let mut rig = Rig::new(baseline(50), backend);
    let t = Task::new("t", Priority::new(10));
    rig.handle().page_miss(&t).unwrap();
    assert!(matches!(
        rig.worker.handle_wake(WakeReason::Signaled),
        Err(PagerFatal::AllocFailed { .. })
    ));

    let mut backend = MockBackend::default();
    backend.fail_start = Some(FillError::InvalidArgument);
    let mut rig = Rig::new(baseline(50), backend);
    let t = Task::new("t", Priority::new(10));
    rig.handle().page_miss(&t).unwrap();
    assert!(matches!(
        rig.worker.handle_wake(WakeReason::Signaled),
        Err(PagerFatal::StartFailed {
            error: FillError::InvalidArgument,
            ..
        })
    ));
}

#[test]
fn wake_without_result_keeps_filling() {
    let mut rig = Rig::new(baseline(50), MockBackend::default());
    let t = Task::new("t", Priority::new(10));
    rig.handle().page_miss(&t).unwrap();
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();

    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    rig.worker.handle_wake(WakeReason::TimedOut).unwrap();
    assert_eq!(rig.worker.state(), WorkerState::Filling);
    assert_eq!(rig.sched.unblock_count(t.id()), 0);
    assert_eq!(rig.worker.stats().spurious_wakes, 1);
    assert_eq!(rig.worker.stats().timed_out_wakes, 1);
}

#[test]
fn fill_timeout_is_fatal() {
    let config = baseline(50).with_timeout_ticks(Some(100));
    let mut rig = Rig::new(config, MockBackend::default());
    let t = Task::new("t", Priority::new(10));
    rig.handle().page_miss(&t).unwrap();
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();

    rig.clock.set(50);
    rig.worker.handle_wake(WakeReason::TimedOut).unwrap();
    rig.clock.set(99);
    rig.worker.handle_wake(WakeReason::TimedOut).unwrap();
    rig.clock.set(100);
    assert_eq!(
        rig.worker.handle_wake(WakeReason::TimedOut),
        Err(PagerFatal::Timeout {
            task: t.id(),
            elapsed: 100,
            bound: 100
        })
    );
    rig.clock.set(150);
    let err = rig.worker.handle_wake(WakeReason::TimedOut).unwrap_err();
    assert_eq!(
        err,
        PagerFatal::Timeout {
            task: t.id(),
            elapsed: 150,
            bound: 100
        }
    );
}

#[test]
fn result_beats_timeout() {
    let config = baseline(50).with_timeout_ticks(Some(100));
    let mut rig = Rig::new(config, MockBackend::default());
    let t = Task::new("t", Priority::new(10));
    rig.handle().page_miss(&t).unwrap();
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();

    rig.clock.set(500);
    rig.worker.backend_mut().finish(Ok(()));
    rig.worker.handle_wake(WakeReason::TimedOut).unwrap();
    assert_eq!(t.state(), TaskState::Ready);
}

#[test]
fn no_timeout_when_unconfigured() {
    let mut rig = Rig::new(baseline(50), MockBackend::default());
    let t = Task::new("t", Priority::new(10));
    rig.handle().page_miss(&t).unwrap();
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    rig.clock.set(u64::MAX / 2);
    rig.worker.handle_wake(WakeReason::TimedOut).unwrap();
    assert_eq!(rig.worker.state(), WorkerState::Filling);
}

#[test]
fn worker_cannot_fault() {
    let rig = Rig::new(baseline(50), MockBackend::default());
    let worker = rig.sched.worker();
    assert_eq!(
        rig.handle().page_miss(&worker),
        Err(PagerFatal::WorkerFaulted)
    );
}

#[test]
fn idle_wake_with_empty_queue_is_noop() {
    let mut rig = Rig::new(baseline(50), MockBackend::default());
    rig.worker.handle_wake(WakeReason::TimedOut).unwrap();
    rig.worker.handle_wake(WakeReason::Signaled).unwrap();
    assert_eq!(rig.worker.state(), WorkerState::Idle);
    assert!(rig.worker.backend().filled.is_empty());
}
