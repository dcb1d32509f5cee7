//! Lesson 23: protecting shared state with a mutex.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::MutexConfig;
use crate::error::{GuardError, LessonError};
use crate::guarded::{self, GuardedCounter, Post, RacyCounter};

pub const KEY_POINTS: &[&str] = &[
    "The lock guard is released on every exit path, including panics",
    "Keep the critical section to the read-modify-write itself",
    "With the lock the count is exact; without it updates get lost",
    "std mutexes are not re-entrant: never lock twice on one thread",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceOutcome {
    pub expected: u64,
    pub observed: u64,
}

impl RaceOutcome {
    pub fn lost(&self) -> u64 {
        self.expected - self.observed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexReport {
    pub views: u64,
    pub expected: u64,
    pub reentrant_blocked: bool,
    pub race: Option<RaceOutcome>,
}

pub fn run(config: &MutexConfig) -> Result<MutexReport, LessonError> {
    info!(workers = config.workers, "mutex lesson");

    let post = Arc::new(Post::new("Concurrency in practice"));
    let views = guarded::hammer(Arc::clone(&post), config.workers, 1)?;
    println!("Views: {views}");

    // A second lock on the same thread would deadlock; try_lock shows it
    // would have to wait instead.
    let counter = GuardedCounter::default();
    let reentrant_blocked =
        counter.with_lock(|_| counter.try_increment()) == Err(GuardError::WouldBlock);
    println!("Second acquisition while holding the lock blocked: {reentrant_blocked}");

    let race = if config.show_race && config.workers > 0 {
        let expected = (config.workers * config.race_increments) as u64;
        let observed = guarded::hammer(
            Arc::new(RacyCounter::new()),
            config.workers,
            config.race_increments,
        )?;
        let outcome = RaceOutcome { expected, observed };
        if outcome.lost() > 0 {
            warn!(lost = outcome.lost(), "unguarded counter lost updates");
        }
        println!("Without the lock: {observed} of {expected} increments survived");
        Some(outcome)
    } else {
        None
    };

    Ok(MutexReport {
        views,
        expected: config.workers as u64,
        reentrant_blocked,
        race,
    })
}
