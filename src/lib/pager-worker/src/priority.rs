use core::fmt::Display;

/// Scheduling priority of a task or of the fill worker. Higher values are more urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 255;

impl Priority {
    pub const MIN: Self = Self(MIN_PRIORITY);
    pub const MAX: Self = Self(MAX_PRIORITY);
    /// Baseline for the fill worker when nothing else is configured.
    pub const DEFAULT_WORKER: Self = Self(100);

    /// Build a priority, clamping into `MIN..=MAX`.
    pub const fn new(value: u8) -> Self {
        if value < MIN_PRIORITY {
            Self::MIN
        } else {
            Self(value)
        }
    }

    pub fn from_raw(raw: u32) -> Self {
        Self::new(raw.min(MAX_PRIORITY as u32) as u8)
    }

    pub fn raw(&self) -> u32 {
        self.0 as u32
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::DEFAULT_WORKER
    }
}

impl From<u8> for Priority {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
