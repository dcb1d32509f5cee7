//! Waiting on several channels at once.
//!
//! `Select` is a builder over `crossbeam::channel::Select`. Each receive arm
//! registers the channel itself and its close notification, so a closed
//! channel counts as ready. When several arms are ready crossbeam picks one
//! at random, so no arm is favoured by its position.
//!
//! ```no_run
//! use concurrency_lessons::channel;
//! use concurrency_lessons::select::Select;
//!
//! let (num_tx, num_rx) = channel::unbuffered::<i32>();
//! let (str_tx, str_rx) = channel::unbuffered::<String>();
//! // Dropping the last sender closes a channel, and a closed channel is
//! // always ready, so keep both open for the two rounds.
//! let (num_keep, str_keep) = (num_tx.clone(), str_tx.clone());
//! std::thread::spawn(move || num_tx.send(10));
//! std::thread::spawn(move || str_tx.send("hello".into()));
//!
//! for _ in 0..2 {
//!     let line = Select::new()
//!         .recv(&num_rx, |num| format!("Received from chan1: {num:?}"))
//!         .recv(&str_rx, |msg| format!("Received from chan2: {msg:?}"))
//!         .wait()
//!         .expect("select has arms");
//!     println!("{line}");
//! }
//! drop((num_keep, str_keep));
//! ```

use std::time::Duration;

use crossbeam::channel::{self as cb, SelectedOperation};
use tracing::trace;

use crate::channel::Receiver;
use crate::error::{RecvError, SelectError};

// Every arm takes two consecutive operation slots: value, then close.
const OPS_PER_ARM: usize = 2;

trait Arm<'a, R> {
    fn register(&self, sel: &mut cb::Select<'a>);
    fn complete(self: Box<Self>, oper: SelectedOperation<'_>, closed: bool) -> R;
}

struct RecvArm<'a, T, F> {
    receiver: &'a Receiver<T>,
    handler: F,
}

impl<'a, T, F, R> Arm<'a, R> for RecvArm<'a, T, F>
where
    F: FnOnce(Result<T, RecvError>) -> R,
{
    fn register(&self, sel: &mut cb::Select<'a>) {
        let receiver: &'a Receiver<T> = self.receiver;
        receiver.register(sel);
    }

    fn complete(self: Box<Self>, oper: SelectedOperation<'_>, closed: bool) -> R {
        let RecvArm { receiver, handler } = *self;
        handler(receiver.complete(oper, closed))
    }
}

enum Wait {
    Forever,
    Timeout(Duration),
}

/// A one-shot select over receive arms with an optional fallback.
pub struct Select<'a, R> {
    arms: Vec<Box<dyn Arm<'a, R> + 'a>>,
    fallback: Option<Box<dyn FnOnce() -> R + 'a>>,
}

impl<'a, R> Default for Select<'a, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R> Select<'a, R> {
    pub fn new() -> Self {
        Select {
            arms: Vec::new(),
            fallback: None,
        }
    }

    /// Adds an arm that receives from `receiver`. The handler gets
    /// `Err(RecvError)` if the channel is closed and drained.
    pub fn recv<T, F>(mut self, receiver: &'a Receiver<T>, handler: F) -> Self
    where
        T: 'a,
        F: FnOnce(Result<T, RecvError>) -> R + 'a,
    {
        self.arms.push(Box::new(RecvArm { receiver, handler }));
        self
    }

    /// Runs `handler` immediately if no arm is ready (Go's `default:` case).
    pub fn fallback<F>(mut self, handler: F) -> Self
    where
        F: FnOnce() -> R + 'a,
    {
        self.fallback = Some(Box::new(handler));
        self
    }

    pub fn wait(self) -> Result<R, SelectError> {
        self.run(Wait::Forever)
    }

    pub fn wait_timeout(self, timeout: Duration) -> Result<R, SelectError> {
        self.run(Wait::Timeout(timeout))
    }

    fn run(self, wait: Wait) -> Result<R, SelectError> {
        let Select { mut arms, fallback } = self;
        if arms.is_empty() && fallback.is_none() {
            return Err(SelectError::NoArms);
        }

        let mut sel = cb::Select::new();
        for arm in &arms {
            arm.register(&mut sel);
        }

        let oper = match (fallback, wait) {
            (Some(fallback), _) => match sel.try_select() {
                Ok(oper) => oper,
                Err(_) => {
                    trace!("select fallback taken");
                    return Ok(fallback());
                }
            },
            (None, Wait::Timeout(timeout)) => sel
                .select_timeout(timeout)
                .map_err(|_| SelectError::Timeout)?,
            (None, Wait::Forever) => sel.select(),
        };

        let index = oper.index();
        trace!(arm = index / OPS_PER_ARM, "select arm ready");
        let arm = arms.swap_remove(index / OPS_PER_ARM);
        Ok(arm.complete(oper, index % OPS_PER_ARM == 1))
    }
}
