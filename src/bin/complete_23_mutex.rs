use anyhow::Result;
use colored::Colorize;

use concurrency_lessons::lessons::mutex;
use concurrency_lessons::{logging, Lesson, LessonConfig};

fn main() -> Result<()> {
    let config = LessonConfig::default();
    logging::init(config.level()?).map_err(|err| anyhow::anyhow!(err))?;

    println!("{}", format!("=== {} ===", Lesson::Mutex.title()).cyan().bold());
    let report = mutex::run(&config.mutex)?;

    if report.views == report.expected {
        println!("{} {} views, none lost", "✓".green(), report.views);
    } else {
        println!("{} {} of {} views", "✗".red(), report.views, report.expected);
    }
    if let Some(race) = report.race {
        println!(
            "{} unguarded counter lost {} of {} increments",
            "!".yellow(),
            race.lost(),
            race.expected
        );
    }

    println!("\n{}", "=== Key Points ===".cyan().bold());
    for (i, point) in mutex::KEY_POINTS.iter().enumerate() {
        println!("{}. {}", i + 1, point);
    }
    Ok(())
}
