//! Lesson 20: launching units of work.
//!
//! Units launched with `go` may print in any order. Sleeping for a second
//! and hoping they are done is not a correctness guarantee, so this lesson
//! waits on a channel first and an explicit join second.

use tracing::{debug, info};

use crate::channel;
use crate::config::GoroutinesConfig;
use crate::error::LessonError;
use crate::task;

pub const KEY_POINTS: &[&str] = &[
    "go() launches a unit of work and returns immediately",
    "Output from concurrent units appears in no particular order",
    "A fixed sleep does not wait for stragglers; join or use a channel",
    "move closures give each unit its own copy of the loop variable",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoroutinesReport {
    /// Ids in the order their "Task N started" line was printed.
    pub started: Vec<usize>,
    /// Ids printed by the closure units.
    pub closures: Vec<usize>,
    /// Ids returned by the joinable units, in launch order.
    pub joined: Vec<usize>,
}

#[derive(Debug)]
enum Event {
    Task(usize),
    Closure(usize),
}

fn task(id: usize) {
    println!("Task {id} started");
}

pub fn run(config: &GoroutinesConfig) -> Result<GoroutinesReport, LessonError> {
    info!(tasks = config.tasks, "goroutines lesson");
    println!("--- Fire-and-forget launch ---");

    let (events_tx, events_rx) = channel::bounded(config.tasks * 2);
    for i in 0..config.tasks {
        let tx = events_tx.clone();
        task::go_named(format!("task-{i}"), move || {
            task(i);
            let _ = tx.send(Event::Task(i));
        })?;

        // The closure captures its own copy of `i`.
        let tx = events_tx.clone();
        task::go(move || {
            println!("{i}");
            let _ = tx.send(Event::Closure(i));
        })?;
    }
    // The units hold the remaining senders; the channel closes when the last
    // of them finishes.
    drop(events_tx);

    let mut started = Vec::with_capacity(config.tasks);
    let mut closures = Vec::with_capacity(config.tasks);
    for event in &events_rx {
        match event {
            Event::Task(id) => started.push(id),
            Event::Closure(id) => closures.push(id),
        }
    }
    debug!(?started, "detached units finished");

    println!("\n--- Explicit join ---");
    let tasks = task::spawn_all(config.tasks, "joined", |id| {
        println!("Joined task {id} running");
        id
    })?;
    let joined = task::join_all(tasks)?;
    println!("All {} joined tasks finished", joined.len());

    Ok(GoroutinesReport {
        started,
        closures,
        joined,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_unit_reports_back() {
        let report = run(&GoroutinesConfig { tasks: 11 }).unwrap();

        let mut started = report.started.clone();
        started.sort_unstable();
        let mut closures = report.closures.clone();
        closures.sort_unstable();

        let expected: Vec<usize> = (0..11).collect();
        assert_eq!(started, expected);
        assert_eq!(closures, expected);
        assert_eq!(report.joined, expected);
    }

    #[test]
    fn test_no_tasks() {
        let report = run(&GoroutinesConfig { tasks: 0 }).unwrap();
        assert!(report.started.is_empty());
        assert!(report.closures.is_empty());
        assert!(report.joined.is_empty());
    }
}
