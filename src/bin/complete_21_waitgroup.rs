use anyhow::Result;
use colored::Colorize;

use concurrency_lessons::{logging, Lesson, LessonConfig};

fn main() -> Result<()> {
    let config = LessonConfig::default();
    logging::init(config.level()?).map_err(|err| anyhow::anyhow!(err))?;

    let lesson = Lesson::WaitGroup;
    println!("{}", format!("=== {} ===", lesson.title()).cyan().bold());
    let report = lesson.run(&config)?;
    println!("\n{} {}", "✓".green(), report);

    println!("\n{}", "=== Key Points ===".cyan().bold());
    for (i, point) in lesson.key_points().iter().enumerate() {
        println!("{}. {}", i + 1, point);
    }
    Ok(())
}
