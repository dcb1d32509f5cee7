use std::fmt;
use std::thread;
use std::time::Instant;

use colored::Colorize;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatFields, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "LESSONS_LOG";

/// Writes `  0.042 INF [task-3] message key=value`: seconds since the
/// subscriber was installed, a three-letter level, and the thread that
/// emitted the event. Debug and trace events also name their module, which
/// is where the primitives log from.
pub struct LessonFormatter {
    started: Instant,
}

impl LessonFormatter {
    pub fn new() -> Self {
        LessonFormatter {
            started: Instant::now(),
        }
    }
}

impl Default for LessonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

fn level_label(level: Level) -> &'static str {
    match level {
        Level::ERROR => "ERR",
        Level::WARN => "WRN",
        Level::INFO => "INF",
        Level::DEBUG => "DBG",
        Level::TRACE => "TRC",
    }
}

// Lesson units are spawned with names; anything else shows its id.
fn thread_label() -> String {
    let current = thread::current();
    match current.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", current.id()),
    }
}

impl<S, N> FormatEvent<S, N> for LessonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let level = *meta.level();

        let label = level_label(level);
        let label = match level {
            Level::ERROR => label.red().bold(),
            Level::WARN => label.yellow().bold(),
            Level::INFO => label.green(),
            Level::DEBUG => label.blue(),
            Level::TRACE => label.dimmed(),
        };
        let elapsed = format!("{:>7.3}", self.started.elapsed().as_secs_f64());
        write!(writer, "{} {} ", elapsed.dimmed(), label)?;
        write!(writer, "{} ", format!("[{}]", thread_label()).cyan())?;
        if level >= Level::DEBUG {
            write!(writer, "{} ", format!("{}:", meta.target()).dimmed())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()))
}

/// Installs the global subscriber. `LESSONS_LOG` wins over `level` when set.
/// Fails if a subscriber is already installed.
pub fn init(level: Level) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .event_format(LessonFormatter::new())
        .with_writer(std::io::stderr)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        // The first call in this process may or may not be this one.
        let _ = init(Level::INFO);
        assert!(init(Level::DEBUG).is_err());
    }

    #[test]
    fn test_level_labels_are_distinct() {
        let labels: Vec<&str> = [
            Level::ERROR,
            Level::WARN,
            Level::INFO,
            Level::DEBUG,
            Level::TRACE,
        ]
        .into_iter()
        .map(level_label)
        .collect();
        assert_eq!(labels, vec!["ERR", "WRN", "INF", "DBG", "TRC"]);
    }

    #[test]
    fn test_thread_label_uses_name() {
        let label = thread::Builder::new()
            .name("worker-7".into())
            .spawn(thread_label)
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(label, "worker-7");
    }
}
