//! The runnable lessons, one module per topic.

pub mod async_tasks;
pub mod channels;
pub mod goroutines;
pub mod mutex;
pub mod waitgroup;

use std::fmt;
use std::str::FromStr;

use crate::config::LessonConfig;
use crate::error::LessonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lesson {
    Goroutines,
    WaitGroup,
    Channels,
    Mutex,
    AsyncTasks,
}

impl Lesson {
    pub const ALL: [Lesson; 5] = [
        Lesson::Goroutines,
        Lesson::WaitGroup,
        Lesson::Channels,
        Lesson::Mutex,
        Lesson::AsyncTasks,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Lesson::Goroutines => "goroutines",
            Lesson::WaitGroup => "waitgroup",
            Lesson::Channels => "channels",
            Lesson::Mutex => "mutex",
            Lesson::AsyncTasks => "async",
        }
    }

    pub fn number(self) -> u32 {
        match self {
            Lesson::Goroutines => 20,
            Lesson::WaitGroup => 21,
            Lesson::Channels => 22,
            Lesson::Mutex => 23,
            Lesson::AsyncTasks => 24,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Lesson::Goroutines => "Goroutines: Fire-and-Forget Units of Work",
            Lesson::WaitGroup => "WaitGroup: Waiting for a Group",
            Lesson::Channels => "Channels: Handoff, Buffers, Close and Select",
            Lesson::Mutex => "Mutex: Guarding Shared State",
            Lesson::AsyncTasks => "Async Tasks: The Same Patterns on Tokio",
        }
    }

    pub fn key_points(self) -> &'static [&'static str] {
        match self {
            Lesson::Goroutines => goroutines::KEY_POINTS,
            Lesson::WaitGroup => waitgroup::KEY_POINTS,
            Lesson::Channels => channels::KEY_POINTS,
            Lesson::Mutex => mutex::KEY_POINTS,
            Lesson::AsyncTasks => async_tasks::KEY_POINTS,
        }
    }

    pub fn run(self, config: &LessonConfig) -> Result<Report, LessonError> {
        Ok(match self {
            Lesson::Goroutines => Report::Goroutines(goroutines::run(&config.goroutines)?),
            Lesson::WaitGroup => Report::WaitGroup(waitgroup::run(&config.waitgroup)?),
            Lesson::Channels => Report::Channels(channels::run(&config.channels)?),
            Lesson::Mutex => Report::Mutex(mutex::run(&config.mutex)?),
            Lesson::AsyncTasks => Report::AsyncTasks(async_tasks::run(config)?),
        })
    }
}

impl fmt::Display for Lesson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Lesson {
    type Err = LessonError;

    /// Accepts the lesson id or its number, e.g. `channels` or `22`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Lesson::ALL
            .into_iter()
            .find(|lesson| lesson.id() == wanted || lesson.number().to_string() == wanted)
            .ok_or_else(|| LessonError::UnknownLesson(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Goroutines(goroutines::GoroutinesReport),
    WaitGroup(waitgroup::WaitGroupReport),
    Channels(channels::ChannelsReport),
    Mutex(mutex::MutexReport),
    AsyncTasks(async_tasks::AsyncReport),
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Goroutines(r) => write!(
                f,
                "{} detached units, {} closures, {} joined",
                r.started.len(),
                r.closures.len(),
                r.joined.len()
            ),
            Report::WaitGroup(r) => write!(f, "{} units completed", r.completed),
            Report::Channels(r) => write!(
                f,
                "sum {}, {} emails sent, {} selected",
                r.sum,
                r.emails_sent.len(),
                r.selected.len()
            ),
            Report::Mutex(r) => {
                write!(f, "{} of {} views counted", r.views, r.expected)?;
                if let Some(race) = r.race {
                    write!(f, ", {} updates lost without the lock", race.lost())?;
                }
                Ok(())
            }
            Report::AsyncTasks(r) => write!(
                f,
                "{} tasks joined, sum {}, {} emails sent, {} views",
                r.joined,
                r.sum,
                r.emails_sent.len(),
                r.views
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_by_id_and_number() {
        assert_eq!("channels".parse::<Lesson>().unwrap(), Lesson::Channels);
        assert_eq!(" Mutex ".parse::<Lesson>().unwrap(), Lesson::Mutex);
        assert_eq!("21".parse::<Lesson>().unwrap(), Lesson::WaitGroup);
        assert_eq!("async".parse::<Lesson>().unwrap(), Lesson::AsyncTasks);
    }

    #[test]
    fn test_unknown_lesson() {
        let err = "threads".parse::<Lesson>().unwrap_err();
        assert!(matches!(err, LessonError::UnknownLesson(ref id) if id == "threads"));
    }

    #[test]
    fn test_ids_and_numbers_are_unique() {
        for (i, a) in Lesson::ALL.iter().enumerate() {
            for b in &Lesson::ALL[i + 1..] {
                assert_ne!(a.id(), b.id());
                assert_ne!(a.number(), b.number());
            }
            assert!(!a.key_points().is_empty());
        }
    }

    #[test]
    fn test_run_dispatches_to_lesson() {
        let config = LessonConfig::default();
        let report = Lesson::WaitGroup.run(&config).unwrap();
        assert!(matches!(report, Report::WaitGroup(ref r) if r.completed == 11));
        assert_eq!(report.to_string(), "11 units completed");
    }
}
