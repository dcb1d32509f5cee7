//! Group-completion barrier.
//!
//! A `WaitGroup` works like a counter:
//! - `add(n)` increments the counter by n before the units start
//! - `done()` decrements it by 1 when a unit finishes
//! - `wait()` blocks until the counter becomes 0
//!
//! `enter()` hands out a guard that performs the decrement on drop, so a unit
//! that returns early or panics still signals exactly once.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{LessonError, WaitGroupError};
use crate::task;

#[derive(Clone, Default)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    count: Mutex<usize>,
    zero: Condvar,
}

impl Inner {
    // The counter is a plain integer, so a panic elsewhere cannot leave it
    // half-updated; recover the guard instead of propagating the poison.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WaitGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: usize) {
        let mut count = self.inner.lock();
        *count += n;
        trace!(count = *count, "wait group add");
    }

    /// Decrements the counter. Calling `done` more often than `add` is
    /// rejected and leaves the counter at zero.
    pub fn done(&self) -> Result<(), WaitGroupError> {
        let mut count = self.inner.lock();
        if *count == 0 {
            return Err(WaitGroupError::NegativeCounter);
        }
        *count -= 1;
        if *count == 0 {
            self.inner.zero.notify_all();
        }
        Ok(())
    }

    pub fn wait(&self) {
        let mut count = self.inner.lock();
        debug!(pending = *count, "waiting for group");
        while *count > 0 {
            count = self
                .inner
                .zero
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Returns `true` if the counter reached zero within `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let count = self.inner.lock();
        let (count, _) = self
            .inner
            .zero
            .wait_timeout_while(count, timeout, |pending| *pending > 0)
            .unwrap_or_else(PoisonError::into_inner);
        *count == 0
    }

    pub fn count(&self) -> usize {
        *self.inner.lock()
    }

    /// Increments the counter by one and returns a guard that decrements it
    /// when dropped.
    pub fn enter(&self) -> WaitGuard {
        self.add(1);
        WaitGuard {
            group: self.clone(),
        }
    }

    /// Registers one unit on the group and launches it. The unit holds the
    /// guard for its whole lifetime; if the launch itself fails the guard is
    /// dropped with the closure and the counter is restored.
    pub fn go<F>(&self, name: impl Into<String>, f: F) -> Result<(), LessonError>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.enter();
        task::go_named(name, move || {
            let _guard = guard;
            f();
        })
    }
}

impl fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitGroup")
            .field("count", &self.count())
            .finish()
    }
}

/// Decrements its `WaitGroup` exactly once, on drop.
#[must_use = "dropping the guard immediately marks the unit as done"]
#[derive(Debug)]
pub struct WaitGuard {
    group: WaitGroup,
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        // Cannot underflow: the guard was created by `enter`, which added one.
        let _ = self.group.done();
    }
}
