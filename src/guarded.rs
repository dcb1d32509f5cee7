//! Lock-guarded shared state.
//!
//! `GuardedCounter` keeps the whole read-modify-write inside one critical
//! section, so after all callers finish it holds exactly the number of
//! increments. `RacyCounter` does the same read and write without the lock
//! and loses updates under contention.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;

use tracing::{debug, warn};

use crate::error::{GuardError, LessonError};
use crate::wait_group::WaitGroup;

pub trait Counter: Send + Sync {
    fn increment(&self);
    fn get(&self) -> u64;
}

// =============================================================================
// Guarded counter
// =============================================================================

#[derive(Debug, Default)]
pub struct GuardedCounter {
    value: Mutex<u64>,
}

impl GuardedCounter {
    pub fn new(initial: u64) -> Self {
        GuardedCounter {
            value: Mutex::new(initial),
        }
    }

    // A holder that panicked cannot have left a torn integer behind, so the
    // value is still usable.
    fn lock(&self) -> MutexGuard<'_, u64> {
        self.value.lock().unwrap_or_else(|poisoned| {
            warn!("counter lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Adds `n` and returns the new value.
    pub fn add(&self, n: u64) -> u64 {
        let mut value = self.lock();
        *value += n;
        *value
    }

    pub fn get(&self) -> u64 {
        *self.lock()
    }

    /// Increments only if the lock is free right now. Fails with
    /// [`GuardError::WouldBlock`] when any caller, including the current
    /// thread, holds it: std mutexes are not re-entrant.
    pub fn try_increment(&self) -> Result<u64, GuardError> {
        let mut value = match self.value.try_lock() {
            Ok(value) => value,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(GuardError::WouldBlock),
        };
        *value += 1;
        Ok(*value)
    }

    /// Runs `f` while holding the lock.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut u64) -> R) -> R {
        let mut value = self.lock();
        f(&mut value)
    }
}

impl Counter for GuardedCounter {
    fn increment(&self) {
        self.add(1);
    }

    fn get(&self) -> u64 {
        GuardedCounter::get(self)
    }
}

// =============================================================================
// Post
// =============================================================================

/// A blog post whose view count may be bumped from many threads at once.
#[derive(Debug, Default)]
pub struct Post {
    pub title: String,
    views: GuardedCounter,
}

impl Post {
    pub fn new(title: impl Into<String>) -> Self {
        Post {
            title: title.into(),
            views: GuardedCounter::default(),
        }
    }

    /// Returns the view count after this view.
    pub fn record_view(&self) -> u64 {
        self.views.add(1)
    }

    pub fn views(&self) -> u64 {
        self.views.get()
    }
}

impl Counter for Post {
    fn increment(&self) {
        self.record_view();
    }

    fn get(&self) -> u64 {
        self.views()
    }
}

// =============================================================================
// Unguarded counter
// =============================================================================

/// Reads, yields, then writes back. Every step is a safe atomic operation but
/// the three together are not, so concurrent increments overwrite each other.
#[derive(Debug, Default)]
pub struct RacyCounter {
    value: AtomicU64,
}

impl RacyCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Counter for RacyCounter {
    fn increment(&self) {
        let current = self.value.load(Ordering::Relaxed);
        // Widen the gap between read and write so the loss shows up even on
        // a single core.
        thread::yield_now();
        self.value.store(current + 1, Ordering::Relaxed);
    }

    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Launches `workers` units that each call `increment` `per_worker` times,
/// waits for all of them on a `WaitGroup` and returns the final count.
pub fn hammer<C>(counter: Arc<C>, workers: usize, per_worker: usize) -> Result<u64, LessonError>
where
    C: Counter + 'static,
{
    let wg = WaitGroup::new();
    for id in 0..workers {
        let counter = Arc::clone(&counter);
        wg.go(format!("inc-{id}"), move || {
            for _ in 0..per_worker {
                counter.increment();
            }
        })?;
    }
    wg.wait();

    let total = counter.get();
    debug!(workers, per_worker, total, "counter hammered");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hundred_views_with_lock() {
        let post = Arc::new(Post::new("Go concurrency"));
        let views = hammer(Arc::clone(&post), 100, 1).unwrap();
        assert_eq!(views, 100);
        assert_eq!(post.views(), 100);
    }

    #[test]
    fn test_ten_thousand_guarded_increments() {
        let counter = Arc::new(GuardedCounter::default());
        assert_eq!(hammer(counter, 16, 625).unwrap(), 10_000);
    }

    #[test]
    fn test_zero_workers() {
        let counter = Arc::new(GuardedCounter::new(5));
        assert_eq!(hammer(counter, 0, 100).unwrap(), 5);
    }

    #[test]
    fn test_racy_counter_loses_updates() {
        let expected = 8 * 2_000;
        let mut lost_any = false;
        for _ in 0..5 {
            let total = hammer(Arc::new(RacyCounter::new()), 8, 2_000).unwrap();
            assert!(total <= expected);
            if total < expected {
                lost_any = true;
                break;
            }
        }
        assert!(lost_any, "unguarded counter never lost an update");
    }

    #[test]
    fn test_record_view_returns_new_count() {
        let post = Post::new("hello");
        assert_eq!(post.record_view(), 1);
        assert_eq!(post.record_view(), 2);
        assert_eq!(post.views(), 2);
        assert_eq!(post.title, "hello");
    }

    #[test]
    fn test_try_increment_while_held_would_block() {
        let counter = GuardedCounter::default();
        let inner = counter.with_lock(|value| {
            *value += 1;
            counter.try_increment()
        });
        assert_eq!(inner, Err(GuardError::WouldBlock));
        assert_eq!(counter.try_increment(), Ok(2));
    }

    #[test]
    fn test_counter_survives_poisoned_lock() {
        let counter = Arc::new(GuardedCounter::new(10));
        let c = Arc::clone(&counter);
        let result = thread::spawn(move || {
            c.with_lock(|value| {
                *value += 1;
                panic!("holder panics");
            })
        })
        .join();
        assert!(result.is_err());

        assert_eq!(counter.get(), 11);
        assert_eq!(counter.add(1), 12);
        assert_eq!(counter.try_increment(), Ok(13));
    }
}
