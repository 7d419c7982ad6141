use std::{
    fmt::Display,
    sync::atomic::{AtomicU64, Ordering},
};

#[derive(Clone, Debug, Default, Copy, PartialEq, Eq, Hash)]
pub struct FillStats {
    pub faults: u64,
    pub fills_started: u64,
    pub fills_completed: u64,
    pub already_mapped: u64,
    pub spurious_wakes: u64,
    pub spurious_callbacks: u64,
    pub timed_out_wakes: u64,
    pub priority_boosts: u64,
    pub idle_transitions: u64,
}

impl Display for FillStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "faults={} started={} completed={} mapped={} boosts={} idle={} spurious={}/{} timed_out={}",
            self.faults,
            self.fills_started,
            self.fills_completed,
            self.already_mapped,
            self.priority_boosts,
            self.idle_transitions,
            self.spurious_wakes,
            self.spurious_callbacks,
            self.timed_out_wakes,
        )
    }
}

/// Counters shared between the worker, the fault path and completions.
#[derive(Default)]
pub(crate) struct StatCounters {
    pub faults: AtomicU64,
    pub fills_started: AtomicU64,
    pub fills_completed: AtomicU64,
    pub already_mapped: AtomicU64,
    pub spurious_wakes: AtomicU64,
    pub spurious_callbacks: AtomicU64,
    pub timed_out_wakes: AtomicU64,
    pub priority_boosts: AtomicU64,
    pub idle_transitions: AtomicU64,
}

#[inline]
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl StatCounters {
    pub fn snapshot(&self) -> FillStats {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        FillStats {
            faults: get(&self.faults),
            fills_started: get(&self.fills_started),
            fills_completed: get(&self.fills_completed),
            already_mapped: get(&self.already_mapped),
            spurious_wakes: get(&self.spurious_wakes),
            spurious_callbacks: get(&self.spurious_callbacks),
            timed_out_wakes: get(&self.timed_out_wakes),
            priority_boosts: get(&self.priority_boosts),
            idle_transitions: get(&self.idle_transitions),
        }
    }
}
