//! Lesson 22: channels.
//!
//! Covers the unbuffered handoff, the done-signal pattern, buffered channels,
//! ranging over a channel until it is closed, and select.

use std::time::Duration;

use tracing::{debug, info};

use crate::channel::{self, DoneGuard, Receiver, Sender};
use crate::config::ChannelsConfig;
use crate::error::{LessonError, RecvError};
use crate::select::Select;
use crate::task;

pub const KEY_POINTS: &[&str] = &[
    "An unbuffered send blocks until a receiver takes the value",
    "A done guard signals completion on every exit path",
    "Buffered sends only block once the buffer is full",
    "Only the producer closes; receivers range until closed and drained",
    "Select takes whichever channel is ready, at random if several are",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selected {
    Number(i32),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelsReport {
    pub processed: i32,
    pub sum: i32,
    pub task_done: bool,
    pub buffered: Vec<String>,
    pub emails_sent: Vec<String>,
    pub selected: Vec<Selected>,
}

// =============================================================================
// Units of work used by the lesson
// =============================================================================

fn process_num(num_rx: Receiver<i32>) -> Result<i32, RecvError> {
    let num = num_rx.recv()?;
    println!("{num}");
    Ok(num)
}

fn sum(result: Sender<i32>, num1: i32, num2: i32) {
    let _ = result.send(num1 + num2);
}

fn task(_done: DoneGuard) {
    println!("Task is running");
}

fn email_sender(email_rx: Receiver<String>, _done: DoneGuard, delay: Duration) -> Vec<String> {
    let mut sent = Vec::new();
    for email in &email_rx {
        println!("Sending email: {email}");
        std::thread::sleep(delay);
        sent.push(email);
    }
    sent
}

// =============================================================================
// Lesson
// =============================================================================

pub fn run(config: &ChannelsConfig) -> Result<ChannelsReport, LessonError> {
    info!("channels lesson");
    let email_delay = config.email_delay();

    println!("--- Unbuffered channel ---");
    let (num_tx, num_rx) = channel::unbuffered();
    let processor = task::spawn("process-num", move || process_num(num_rx))?;
    num_tx.send(config.number)?;
    let processed = processor.join()??;

    let (result_tx, result_rx) = channel::unbuffered();
    let [num1, num2] = config.sum_operands;
    task::go(move || sum(result_tx, num1, num2))?;
    let sum = result_rx.recv()?;
    println!("{sum}");

    println!("\n--- Done signal ---");
    let (done, done_rx) = channel::done_signal();
    task::go(move || task(done))?;
    let task_done = done_rx.recv()?;
    println!("Task is done");

    println!("\n--- Buffered channel ---");
    let (buffered_tx, buffered_rx) = channel::bounded(config.buffer_capacity);
    buffered_tx.send("message 1".to_string())?;
    buffered_tx.send("message 2".to_string())?;
    buffered_tx.send("message 3".to_string())?;
    let mut buffered = Vec::with_capacity(2);
    for _ in 0..2 {
        let message = buffered_rx.recv()?;
        println!("{message}");
        buffered.push(message);
    }
    buffered_tx.close()?;

    println!("\n--- Range over a closed channel ---");
    let (email_tx, email_rx) = channel::bounded(config.email_queue_capacity);
    let (done, done_rx) = channel::done_signal();
    let sender = task::spawn("email-sender", move || {
        email_sender(email_rx, done, email_delay)
    })?;
    for i in 1..=config.emails {
        email_tx.send(format!("{i}@example.com"))?;
    }
    println!("All emails sent");
    // Closing tells the sender no more emails are coming.
    email_tx.close()?;
    done_rx.recv()?;
    let emails_sent = sender.join()?;
    debug!(count = emails_sent.len(), "email sender finished");

    println!("\n--- Select ---");
    let (chan1_tx, chan1_rx) = channel::unbuffered::<i32>();
    let (chan2_tx, chan2_rx) = channel::unbuffered::<String>();
    // Keep both channels open: a closed channel is always ready in a select.
    let keep_open = (chan1_tx.clone(), chan2_tx.clone());
    let number = config.select_number;
    let text = config.select_text.clone();
    task::go(move || {
        let _ = chan1_tx.send(number);
    })?;
    task::go(move || {
        let _ = chan2_tx.send(text);
    })?;

    let mut selected = Vec::with_capacity(2);
    for _ in 0..2 {
        let picked = Select::new()
            .recv(&chan1_rx, |num| {
                num.map(|num| {
                    println!("Received from chan1: {num}");
                    Selected::Number(num)
                })
            })
            .recv(&chan2_rx, |msg| {
                msg.map(|msg| {
                    println!("Received from chan2: {msg}");
                    Selected::Text(msg)
                })
            })
            .wait()??;
        selected.push(picked);
    }
    drop(keep_open);

    Ok(ChannelsReport {
        processed,
        sum,
        task_done,
        buffered,
        emails_sent,
        selected,
    })
}
