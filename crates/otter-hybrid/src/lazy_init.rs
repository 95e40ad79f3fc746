//! One-time initialization of a hybrid object's tables.
//!
//! State machine: `Uninitialized -> Initializing -> Initialized`.
//!
//! Only the transition takes the lock. Once `Initialized`, readers go
//! straight to the frozen tables. Setup builds into a scratch table that is
//! published only if it succeeds, so a failed attempt leaves nothing behind
//! and the next access retries from scratch.

use std::sync::atomic::{AtomicU8, Ordering};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::HybridResult;

/// Initialization state of a hybrid object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InitState {
    /// Setup has not run, or the last attempt failed
    Uninitialized = 0,
    /// Setup is running on some thread
    Initializing = 1,
    /// Tables are populated and frozen
    Initialized = 2,
}

impl InitState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => InitState::Initializing,
            2 => InitState::Initialized,
            _ => InitState::Uninitialized,
        }
    }
}

/// A value built at most once by a fallible setup routine.
pub(crate) struct LazyInit<T> {
    state: AtomicU8,
    transition: Mutex<()>,
    value: OnceCell<T>,
}

impl<T> LazyInit<T> {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(InitState::Uninitialized as u8),
            transition: Mutex::new(()),
            value: OnceCell::new(),
        }
    }

    pub(crate) fn state(&self) -> InitState {
        InitState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Get the value if setup already succeeded.
    pub(crate) fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Get the value, running `setup` if no attempt has succeeded yet.
    ///
    /// Concurrent callers block on the transition lock; exactly one runs
    /// `setup`. `setup` must not re-enter this `LazyInit`.
    pub(crate) fn get_or_try_init(&self, setup: impl FnOnce() -> HybridResult<T>) -> HybridResult<&T> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let _guard = self.transition.lock();
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        self.state
            .store(InitState::Initializing as u8, Ordering::Release);
        let transition = TransitionGuard { state: &self.state };
        let value = setup()?;
        let value = self.value.get_or_init(|| value);
        self.state
            .store(InitState::Initialized as u8, Ordering::Release);
        drop(transition);
        Ok(value)
    }
}

/// Returns the state to `Uninitialized` if setup errs or unwinds.
struct TransitionGuard<'a> {
    state: &'a AtomicU8,
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        let _ = self.state.compare_exchange(
            InitState::Initializing as u8,
            InitState::Uninitialized as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }
}
