//! The fill result register: holds the outcome of the in-flight asynchronous fill until the worker
//! picks it up.

use std::str::FromStr;

use crate::backend::{FillError, FillStatus};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegisterKind {
    /// A one-slot channel between the completion path and the worker.
    #[default]
    Channel,
    /// A spin-locked cell holding the busy sentinel while empty, for completions that run where
    /// a channel send is not allowed.
    Locked,
}

impl FromStr for RegisterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "channel" => Ok(Self::Channel),
            "locked" => Ok(Self::Locked),
            _ => Err(format!("unknown register kind: {}", s)),
        }
    }
}

// Sentinel meaning "no result yet".
const NO_RESULT: FillStatus = Err(FillError::Busy);

pub enum ResultRegister {
    Channel {
        send: async_channel::Sender<FillStatus>,
        recv: async_channel::Receiver<FillStatus>,
    },
    Locked(spin::Mutex<FillStatus>),
}

impl ResultRegister {
    pub fn new(kind: RegisterKind) -> Self {
        match kind {
            RegisterKind::Channel => {
                let (send, recv) = async_channel::bounded(1);
                Self::Channel { send, recv }
            }
            RegisterKind::Locked => Self::Locked(spin::Mutex::new(NO_RESULT)),
        }
    }

    pub fn kind(&self) -> RegisterKind {
        match self {
            Self::Channel { .. } => RegisterKind::Channel,
            Self::Locked(_) => RegisterKind::Locked,
        }
    }

    /// Record a fill outcome. `Err(Busy)` must already have been remapped by the caller.
    pub fn store(&self, status: FillStatus) {
        debug_assert_ne!(status, NO_RESULT);
        match self {
            Self::Channel { send, .. } => {
                if let Err(e) = send.try_send(status) {
                    tracing::warn!("dropping fill result {:?}: unread result pending", e.into_inner());
                }
            }
            Self::Locked(cell) => {
                let mut cell = cell.lock();
                if *cell != NO_RESULT {
                    tracing::warn!("dropping fill result {:?}: unread result pending", status);
                } else {
                    *cell = status;
                }
            }
        }
    }

    /// Read and clear. `None` means no result has arrived.
    pub fn take(&self) -> Option<FillStatus> {
        match self {
            Self::Channel { recv, .. } => recv.try_recv().ok(),
            Self::Locked(cell) => {
                let status = core::mem::replace(&mut *cell.lock(), NO_RESULT);
                (status != NO_RESULT).then_some(status)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Channel { recv, .. } => recv.is_empty(),
            Self::Locked(cell) => *cell.lock() == NO_RESULT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_register(kind: RegisterKind) {
        let reg = ResultRegister::new(kind);
        assert_eq!(reg.kind(), kind);
        assert!(reg.is_empty());
        assert_eq!(reg.take(), None);

        reg.store(Err(FillError::Io));
        assert!(!reg.is_empty());
        assert_eq!(reg.take(), Some(Err(FillError::Io)));
        assert_eq!(reg.take(), None);

        reg.store(Ok(()));
        assert_eq!(reg.take(), Some(Ok(())));
    }

    #[test]
    fn test_channel_register() {
        check_register(RegisterKind::Channel);
    }

    #[test]
    fn test_locked_register() {
        check_register(RegisterKind::Locked);
    }

    #[test]
    fn test_second_store_keeps_first() {
        for kind in [RegisterKind::Channel, RegisterKind::Locked] {
            let reg = ResultRegister::new(kind);
            reg.store(Ok(()));
            reg.store(Err(FillError::Io));
            assert_eq!(reg.take(), Some(Ok(())));
            assert_eq!(reg.take(), None);
        }
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("locked".parse::<RegisterKind>(), Ok(RegisterKind::Locked));
        assert_eq!("channel".parse::<RegisterKind>(), Ok(RegisterKind::Channel));
        assert!("fifo".parse::<RegisterKind>().is_err());
    }
}
