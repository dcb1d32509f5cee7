use std::fmt;
use std::io;

use thiserror::Error;

// =============================================================================
// Channel errors
// =============================================================================

/// Returned by `Sender::send` when the value could not be delivered.
/// The value is handed back so the caller keeps ownership of it.
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum SendError<T> {
    /// The channel was closed before the value was accepted.
    Closed(T),
    /// Every receiver has been dropped.
    Disconnected(T),
}

impl<T> SendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            SendError::Closed(value) | SendError::Disconnected(value) => value,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, SendError::Closed(_))
    }
}

// Written by hand so that `T` does not need to be `Debug`.
impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Closed(_) => f.write_str("Closed(..)"),
            SendError::Disconnected(_) => f.write_str("Disconnected(..)"),
        }
    }
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Closed(_) => f.write_str("send on closed channel"),
            SendError::Disconnected(_) => f.write_str("send on channel with no receivers"),
        }
    }
}

impl<T> std::error::Error for SendError<T> {}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("receive on closed and drained channel")]
pub struct RecvError;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    #[error("channel is empty")]
    Empty,
    #[error("channel is closed and drained")]
    Closed,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvTimeoutError {
    #[error("timed out waiting on channel")]
    Timeout,
    #[error("channel is closed and drained")]
    Closed,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("close of closed channel")]
    AlreadyClosed,
}

// =============================================================================
// Barrier, select and lock errors
// =============================================================================

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitGroupError {
    #[error("negative WaitGroup counter: done() called more times than add()")]
    NegativeCounter,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectError {
    #[error("select has no arms and would block forever")]
    NoArms,
    #[error("no arm became ready before the timeout")]
    Timeout,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardError {
    #[error("lock is held by another caller")]
    WouldBlock,
}

// =============================================================================
// Configuration errors
// =============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("value {value} for field '{field}' is out of range (min: {min}, max: {max})")]
    OutOfRange {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("invalid log level '{0}': expected one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

// =============================================================================
// Lesson errors
// =============================================================================

#[derive(Error, Debug)]
pub enum LessonError {
    #[error("failed to spawn unit of work '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("unit of work '{0}' panicked")]
    TaskPanicked(String),

    #[error("unknown lesson '{0}'")]
    UnknownLesson(String),

    #[error(transparent)]
    Recv(#[from] RecvError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    WaitGroup(#[from] WaitGroupError),

    #[error(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Send(String),
}

impl<T> From<SendError<T>> for LessonError {
    fn from(err: SendError<T>) -> Self {
        LessonError::Send(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_error_returns_value() {
        let err = SendError::Closed(String::from("late"));
        assert!(err.is_closed());
        assert_eq!(err.into_inner(), "late");
    }

    #[test]
    fn test_send_error_display() {
        assert_eq!(SendError::Closed(1).to_string(), "send on closed channel");
        assert_eq!(
            SendError::Disconnected(1).to_string(),
            "send on channel with no receivers"
        );
    }

    #[test]
    fn test_send_error_converts_into_lesson_error() {
        let err: LessonError = SendError::Closed(5u8).into();
        assert!(matches!(err, LessonError::Send(ref msg) if msg == "send on closed channel"));
    }

    #[test]
    fn test_out_of_range_message() {
        let err = ConfigError::OutOfRange {
            field: "channels.buffer_capacity",
            value: 1,
            min: 3,
            max: 4096,
        };
        assert_eq!(
            err.to_string(),
            "value 1 for field 'channels.buffer_capacity' is out of range (min: 3, max: 4096)"
        );
    }
}
