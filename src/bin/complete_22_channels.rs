use std::env;

use anyhow::{Context, Result};
use colored::Colorize;

use concurrency_lessons::lessons::channels;
use concurrency_lessons::{logging, Lesson, LessonConfig};

// Optional first argument: a TOML file, e.g. one with `[channels] email_delay_ms = 0`.
fn main() -> Result<()> {
    let path = env::args_os().nth(1);
    let config = match &path {
        Some(path) => LessonConfig::load(path).context("failed to load lesson config")?,
        None => LessonConfig::default(),
    };
    logging::init(config.level()?).map_err(|err| anyhow::anyhow!(err))?;

    println!("{}", format!("=== {} ===", Lesson::Channels.title()).cyan().bold());
    let report = channels::run(&config.channels)?;
    println!(
        "\n{} processed {}, sum {}, {} emails sent",
        "✓".green(),
        report.processed,
        report.sum,
        report.emails_sent.len()
    );

    println!("\n{}", "=== Key Points ===".cyan().bold());
    for (i, point) in channels::KEY_POINTS.iter().enumerate() {
        println!("{}. {}", i + 1, point);
    }
    Ok(())
}
