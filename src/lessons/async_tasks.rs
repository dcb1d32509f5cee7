//! The goroutine, waitgroup, channel and mutex patterns again, this time as
//! async tasks on a small pool of worker threads.

use tracing::info;

use crate::asynchronous;
use crate::config::LessonConfig;
use crate::error::LessonError;

pub const KEY_POINTS: &[&str] = &[
    "Many tasks share a few worker threads, like goroutines on Go's scheduler",
    "JoinSet is the async group-completion barrier",
    "Dropping the last mpsc sender closes the queue",
    "tokio::select! races several branches and disables exhausted ones",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncReport {
    pub joined: usize,
    pub sum: i64,
    pub emails_sent: Vec<String>,
    pub selected: Vec<String>,
    pub views: u64,
}

pub fn run(config: &LessonConfig) -> Result<AsyncReport, LessonError> {
    info!(
        worker_threads = config.runtime.worker_threads,
        "async tasks lesson"
    );
    let runtime = asynchronous::runtime(config.runtime.worker_threads).map_err(|source| {
        LessonError::Spawn {
            name: "async runtime".to_string(),
            source,
        }
    })?;

    runtime.block_on(async {
        let joined = asynchronous::launch_and_join(config.goroutines.tasks).await?;
        println!("Joined {} tasks, completion order {:?}", joined.len(), joined);

        let [a, b] = config.channels.sum_operands;
        let sum = asynchronous::sum(i64::from(a), i64::from(b)).await?;
        println!("{sum}");

        let emails = (1..=config.channels.emails)
            .map(|i| format!("{i}@example.com"))
            .collect();
        let emails_sent = asynchronous::send_emails(
            config.channels.email_queue_capacity,
            emails,
            config.channels.email_delay(),
        )
        .await?;
        println!("Sent {} emails", emails_sent.len());

        let selected = asynchronous::select_two(
            config.channels.select_number,
            config.channels.select_text.clone(),
        )
        .await?;
        for line in &selected {
            println!("{line}");
        }

        let views = asynchronous::count_views(config.mutex.workers).await?;
        println!("Views: {views}");

        Ok(AsyncReport {
            joined: joined.len(),
            sum,
            emails_sent,
            selected,
            views,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_lesson_report() {
        let mut config = LessonConfig::default();
        config.channels.email_delay_ms = 0;
        config.runtime.worker_threads = 2;

        let report = run(&config).unwrap();
        assert_eq!(report.joined, 11);
        assert_eq!(report.sum, 30);
        assert_eq!(report.emails_sent.len(), 4);
        assert_eq!(report.selected.len(), 2);
        assert_eq!(report.views, 100);
    }
}
