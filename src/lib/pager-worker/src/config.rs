use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::{priority::Priority, register::RegisterKind};

/// Tunables for the page fill worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PagerConfig {
    /// How long the worker sleeps between wakes if nobody signals it.
    pub work_period: Duration,
    /// Worker priority while idle.
    pub default_priority: Priority,
    /// Declare a fill failed if no completion arrives within this many ticks.
    pub timeout_ticks: Option<u64>,
    pub register: RegisterKind,
}

pub const DEFAULT_WORK_PERIOD: Duration = Duration::from_millis(500);

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            work_period: DEFAULT_WORK_PERIOD,
            default_priority: Priority::DEFAULT_WORKER,
            timeout_ticks: None,
            register: RegisterKind::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
pub enum ConfigError {
    #[error("work period must be non-zero")]
    #[diagnostic(code(pager::config::work_period))]
    ZeroWorkPeriod,
    #[error("fill timeout must be at least one tick")]
    #[diagnostic(
        code(pager::config::timeout),
        help("leave the timeout unset to disable fill timeout detection")
    )]
    ZeroTimeout,
}

impl PagerConfig {
    pub fn with_work_period(mut self, period: Duration) -> Self {
        self.work_period = period;
        self
    }

    pub fn with_default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }

    pub fn with_timeout_ticks(mut self, ticks: Option<u64>) -> Self {
        self.timeout_ticks = ticks;
        self
    }

    pub fn with_register(mut self, register: RegisterKind) -> Self {
        self.register = register;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.work_period.is_zero() {
            return Err(ConfigError::ZeroWorkPeriod);
        }
        if self.timeout_ticks == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
