//! Interrupt masking for the pager's shared state.
//!
//! The fault path, the completion callback and the fill worker all touch the same wait queue and
//! pending-fill slot. Every such access goes through an [`IrqLock`], whose guard masks the current
//! context on acquire and restores the previous mask state when dropped.

use core::{
    cell::Cell,
    ops::{Deref, DerefMut},
};

std::thread_local! {
    static MASKED: Cell<bool> = const { Cell::new(false) };
}

/// Mask the current context. Returns the previous state, for passing back to [`set`].
#[inline]
pub fn disable() -> bool {
    MASKED.with(|m| m.replace(true))
}

#[inline]
pub fn set(state: bool) {
    MASKED.with(|m| m.set(state));
}

#[inline]
pub fn is_disabled() -> bool {
    MASKED.with(|m| m.get())
}

// Puts the saved mask state back on drop, including when unwinding.
struct Restore(bool);

impl Drop for Restore {
    fn drop(&mut self) {
        set(self.0);
    }
}

#[inline]
pub fn with_disabled<T, F: FnOnce() -> T>(f: F) -> T {
    let _restore = Restore(disable());
    f()
}

pub struct IrqLock<T> {
    inner: spin::Mutex<T>,
}

impl<T> IrqLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: spin::Mutex::new(data),
        }
    }

    pub fn lock(&self) -> IrqGuard<'_, T> {
        let interrupt_state = disable();
        IrqGuard {
            guard: self.inner.lock(),
            interrupt_state,
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }
}

pub struct IrqGuard<'a, T> {
    guard: spin::MutexGuard<'a, T>,
    interrupt_state: bool,
}

impl<T> Deref for IrqGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for IrqGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<T> Drop for IrqGuard<'_, T> {
    fn drop(&mut self) {
        set(self.interrupt_state);
    }
}
