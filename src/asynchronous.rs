//! The same patterns as lightweight tasks multiplexed over a few OS threads.
//!
//! Everything in the threaded modules blocks an OS thread while it waits.
//! Here the units of work are tokio tasks: waiting parks the task and frees
//! the worker thread for another one, which is how goroutines behave.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::{Builder, Runtime};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::{LessonError, RecvError};

/// Builds a multi-threaded runtime with `workers` worker threads.
pub fn runtime(workers: usize) -> io::Result<Runtime> {
    Builder::new_multi_thread()
        .worker_threads(workers.max(1))
        .thread_name("lesson-worker")
        .enable_all()
        .build()
}

fn join_failed(err: tokio::task::JoinError) -> LessonError {
    LessonError::TaskPanicked(format!("async task ({err})"))
}

/// Spawns `count` tasks and returns their ids in completion order.
pub async fn launch_and_join(count: usize) -> Result<Vec<usize>, LessonError> {
    let mut set = JoinSet::new();
    for id in 0..count {
        set.spawn(async move {
            tokio::task::yield_now().await;
            id
        });
    }

    let mut finished = Vec::with_capacity(count);
    while let Some(result) = set.join_next().await {
        finished.push(result.map_err(join_failed)?);
    }
    debug!(count, "async tasks joined");
    Ok(finished)
}

/// Computes `a + b` in another task and hands the result back over a oneshot.
pub async fn sum(a: i64, b: i64) -> Result<i64, LessonError> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = tx.send(a + b);
    });
    rx.await.map_err(|_| LessonError::from(RecvError))
}

/// Pushes `emails` through a bounded queue to a sender task that takes
/// `delay` per email. Returns what the sender task processed, in order.
pub async fn send_emails(
    capacity: usize,
    emails: Vec<String>,
    delay: Duration,
) -> Result<Vec<String>, LessonError> {
    // tokio's bounded channel needs room for at least one value.
    let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));

    let sender = tokio::spawn(async move {
        let mut sent = Vec::new();
        while let Some(email) = rx.recv().await {
            tokio::time::sleep(delay).await;
            sent.push(email);
        }
        sent
    });

    for email in emails {
        tx.send(email)
            .await
            .map_err(|err| LessonError::Send(err.to_string()))?;
    }
    // Dropping the only sender closes the queue and ends the loop above.
    drop(tx);

    sender.await.map_err(join_failed)
}

/// Two producers, one value each; `tokio::select!` takes whichever is ready.
pub async fn select_two(number: i32, text: String) -> Result<Vec<String>, LessonError> {
    let (num_tx, mut num_rx) = mpsc::channel::<i32>(1);
    let (str_tx, mut str_rx) = mpsc::channel::<String>(1);
    tokio::spawn(async move {
        let _ = num_tx.send(number).await;
    });
    tokio::spawn(async move {
        let _ = str_tx.send(text).await;
    });

    let mut received = Vec::with_capacity(2);
    while received.len() < 2 {
        tokio::select! {
            Some(num) = num_rx.recv() => received.push(format!("Received from chan1: {num}")),
            Some(msg) = str_rx.recv() => received.push(format!("Received from chan2: {msg}")),
            else => break,
        }
    }
    Ok(received)
}

/// `workers` tasks each bump a shared counter behind an async mutex.
pub async fn count_views(workers: usize) -> Result<u64, LessonError> {
    let views = Arc::new(Mutex::new(0u64));
    let mut set = JoinSet::new();
    for _ in 0..workers {
        let views = Arc::clone(&views);
        set.spawn(async move {
            *views.lock().await += 1;
        });
    }
    while let Some(result) = set.join_next().await {
        result.map_err(join_failed)?;
    }
    let total = *views.lock().await;
    Ok(total)
}
