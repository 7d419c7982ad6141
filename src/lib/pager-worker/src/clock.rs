use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Source of system ticks for fill timeout detection.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

pub struct SystemClock {
    start: Instant,
    tick: Duration,
}

impl SystemClock {
    pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

    pub fn new(tick: Duration) -> Self {
        Self {
            start: Instant::now(),
            tick: if tick.is_zero() {
                Self::DEFAULT_TICK
            } else {
                tick
            },
        }
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TICK)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        (self.start.elapsed().as_nanos() / self.tick.as_nanos()) as u64
    }
}

/// Clock that only moves when told to.
#[derive(Default)]
pub struct ManualClock {
    ticks: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            ticks: AtomicU64::new(start),
        }
    }

    pub fn set(&self, ticks: u64) {
        self.ticks.store(ticks, Ordering::SeqCst);
    }

    pub fn advance(&self, ticks: u64) -> u64 {
        self.ticks.fetch_add(ticks, Ordering::SeqCst) + ticks
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}
