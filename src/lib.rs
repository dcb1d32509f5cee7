//! Concurrency lessons: launching units of work, waiting for a group of them,
//! passing values over channels, choosing between channels with select, and
//! guarding shared counters with a mutex.
//!
//! The blocking primitives (`task`, `wait_group`, `channel`, `select`,
//! `guarded`) run each unit of work on its own OS thread. `asynchronous`
//! repeats the same patterns as tokio tasks, where many tasks share a small
//! pool of worker threads.

pub mod asynchronous;
pub mod channel;
pub mod config;
pub mod error;
pub mod guarded;
pub mod lessons;
pub mod logging;
pub mod select;
pub mod task;
pub mod wait_group;

pub use channel::{bounded, done_signal, unbuffered, DoneGuard, Receiver, Sender};
pub use config::LessonConfig;
pub use error::{
    ChannelError, ConfigError, GuardError, LessonError, RecvError, RecvTimeoutError, SelectError,
    SendError, TryRecvError, WaitGroupError,
};
pub use guarded::{GuardedCounter, Post};
pub use lessons::{Lesson, Report};
pub use select::Select;
pub use task::{go, spawn, Task};
pub use wait_group::{WaitGroup, WaitGuard};
