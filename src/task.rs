//! Launching units of work.
//!
//! `go` is fire-and-forget: the launcher gets no handle and never observes the
//! outcome of the unit. `spawn` is the joinable form used wherever the caller
//! must know that work has finished.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

use crate::error::LessonError;

/// Launches `f` as an independent unit of work and returns immediately.
pub fn go<F>(f: F) -> Result<(), LessonError>
where
    F: FnOnce() + Send + 'static,
{
    go_named("go", f)
}

/// Like [`go`], with a name that shows up in logs and panic messages.
pub fn go_named<F>(name: impl Into<String>, f: F) -> Result<(), LessonError>
where
    F: FnOnce() + Send + 'static,
{
    let name = name.into();
    trace!(unit = %name, "launching detached unit");
    // The JoinHandle is dropped right away, which detaches the thread.
    thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|source| LessonError::Spawn { name, source })?;
    Ok(())
}

/// A joinable unit of work.
#[derive(Debug)]
pub struct Task<T> {
    name: String,
    handle: JoinHandle<T>,
}

impl<T> Task<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the unit finishes. A panic inside the unit is reported as
    /// [`LessonError::TaskPanicked`] instead of being propagated.
    pub fn join(self) -> Result<T, LessonError> {
        let Task { name, handle } = self;
        handle.join().map_err(|_| LessonError::TaskPanicked(name))
    }
}

pub fn spawn<F, T>(name: impl Into<String>, f: F) -> Result<Task<T>, LessonError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let name = name.into();
    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|source| LessonError::Spawn {
            name: name.clone(),
            source,
        })?;
    trace!(unit = %name, "launched joinable unit");
    Ok(Task { name, handle })
}

/// Launches `count` joinable units running `f(0)`, `f(1)`, ..., `f(count - 1)`.
pub fn spawn_all<F, T>(count: usize, prefix: &str, f: F) -> Result<Vec<Task<T>>, LessonError>
where
    F: Fn(usize) -> T + Send + Sync + 'static,
    T: Send + 'static,
{
    let f = Arc::new(f);
    let mut tasks = Vec::with_capacity(count);
    for id in 0..count {
        let f = Arc::clone(&f);
        tasks.push(spawn(format!("{prefix}-{id}"), move || f(id))?);
    }
    debug!(count, prefix, "launched units");
    Ok(tasks)
}

/// Joins every task in launch order. All tasks are joined even when one of
/// them panicked; the first failure is returned.
pub fn join_all<T>(tasks: Vec<Task<T>>) -> Result<Vec<T>, LessonError> {
    let mut results = Vec::with_capacity(tasks.len());
    let mut first_err = None;
    for task in tasks {
        match task.join() {
            Ok(value) => results.push(value),
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }
    }
    match first_err {
        Some(err) => Err(err),
        None => Ok(results),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_go_runs_detached_unit() {
        let (tx, rx) = mpsc::channel();
        go(move || tx.send(42).unwrap()).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    }

    #[test]
    fn test_go_named_sets_thread_name() {
        let (tx, rx) = mpsc::channel();
        go_named("task-7", move || {
            tx.send(thread::current().name().map(String::from)).unwrap();
        })
        .unwrap();
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("task-7"));
    }

    #[test]
    fn test_spawn_join_returns_value() {
        let data = vec![1, 2, 3, 4, 5];
        let task = spawn("sum", move || data.iter().sum::<i32>()).unwrap();
        assert_eq!(task.name(), "sum");
        assert_eq!(task.join().unwrap(), 15);
    }

    #[test]
    fn test_spawn_panic_becomes_error() {
        let task = spawn("boom", || -> i32 { panic!("intentional") }).unwrap();
        let err = task.join().unwrap_err();
        assert!(matches!(err, LessonError::TaskPanicked(ref name) if name == "boom"));
    }

    #[test]
    fn test_spawn_all_joins_every_unit() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let tasks = spawn_all(11, "task", move |id| {
            c.fetch_add(1, Ordering::SeqCst);
            id * 2
        })
        .unwrap();

        let results = join_all(tasks).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert_eq!(results, (0..11).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_spawn_all_zero_units() {
        let tasks = spawn_all(0, "none", |id| id).unwrap();
        assert!(join_all(tasks).unwrap().is_empty());
    }

    #[test]
    fn test_join_all_reports_panic_after_joining_rest() {
        let finished = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&finished);
        let tasks = spawn_all(4, "mixed", move |id| {
            if id == 1 {
                panic!("unit 1 fails");
            }
            f.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let err = join_all(tasks).unwrap_err();
        assert!(matches!(err, LessonError::TaskPanicked(ref name) if name == "mixed-1"));
        assert_eq!(finished.load(Ordering::SeqCst), 3);
    }
}
