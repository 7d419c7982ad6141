use std::{pin::pin, time::Duration};

use async_io::Timer;
use futures::future::{select, Either};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WakeReason {
    Signaled,
    TimedOut,
}

/// Wake-up line for the fill worker. Raising it while a wake is already pending is a no-op, so any
/// number of faults and completions collapse into one wake.
pub struct WorkerSignal {
    send: async_channel::Sender<()>,
    recv: async_channel::Receiver<()>,
}

impl Default for WorkerSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerSignal {
    pub fn new() -> Self {
        let (send, recv) = async_channel::bounded(1);
        Self { send, recv }
    }

    /// Never blocks; safe to call from a completion context.
    pub fn raise(&self) {
        let _ = self.send.try_send(());
    }

    pub fn is_raised(&self) -> bool {
        !self.recv.is_empty()
    }

    /// Consume a pending wake without sleeping.
    pub fn try_take(&self) -> bool {
        self.recv.try_recv().is_ok()
    }

    /// Sleep for `period`, or until raised.
    pub fn wait(&self, period: Duration) -> WakeReason {
        async_io::block_on(async {
            let recv = pin!(self.recv.recv());
            match select(recv, Timer::after(period)).await {
                Either::Left((Ok(()), _)) => WakeReason::Signaled,
                Either::Left((Err(_), _)) => {
                    tracing::warn!("worker signal closed");
                    WakeReason::TimedOut
                }
                Either::Right(_) => WakeReason::TimedOut,
            }
        })
    }
}
