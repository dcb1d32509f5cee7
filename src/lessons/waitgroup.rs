//! Lesson 21: waiting for a group of units with a `WaitGroup`.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::config::WaitGroupConfig;
use crate::error::LessonError;
use crate::task;
use crate::wait_group::{WaitGroup, WaitGuard};

pub const KEY_POINTS: &[&str] = &[
    "add(n) before launching, done() once per unit, wait() until zero",
    "A WaitGuard calls done() on drop, even on early return or panic",
    "wait() gives no result values; use a channel when you need them",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitGroupReport {
    pub completed: usize,
    /// Ids in the order the units finished.
    pub order: Vec<usize>,
}

fn task(id: usize, _done: WaitGuard, order: &Mutex<Vec<usize>>) {
    println!("Task {id} started");
    order
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(id);
}

pub fn run(config: &WaitGroupConfig) -> Result<WaitGroupReport, LessonError> {
    info!(tasks = config.tasks, "waitgroup lesson");

    let wg = WaitGroup::new();
    let order = Arc::new(Mutex::new(Vec::with_capacity(config.tasks)));

    for i in 0..config.tasks {
        // Count the unit before it starts.
        let done = wg.enter();
        let order = Arc::clone(&order);
        task::go_named(format!("task-{i}"), move || task(i, done, &order))?;
    }

    wg.wait();

    let order = order.lock().unwrap_or_else(PoisonError::into_inner).clone();
    println!("All {} tasks finished", order.len());
    Ok(WaitGroupReport {
        completed: order.len(),
        order,
    })
}
