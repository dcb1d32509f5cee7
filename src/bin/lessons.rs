use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::error;

use concurrency_lessons::{logging, Lesson, LessonConfig};

#[derive(Parser)]
#[command(name = "lessons")]
#[command(about = "Runnable concurrency lessons")]
#[command(version)]
struct Cli {
    /// TOML file overriding the lesson defaults
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available lessons
    List,
    /// Run one lesson by id or number
    Run { lesson: String },
    /// Run every lesson in order
    All,
}

fn print_header(lesson: Lesson) {
    println!(
        "{}",
        format!("=== {}. {} ===", lesson.number(), lesson.title())
            .cyan()
            .bold()
    );
}

fn print_key_points(lesson: Lesson) {
    println!("\n{}", "=== Key Points ===".cyan().bold());
    for (i, point) in lesson.key_points().iter().enumerate() {
        println!("{}. {}", i + 1, point);
    }
}

fn run_lesson(lesson: Lesson, config: &LessonConfig) -> Result<()> {
    print_header(lesson);
    let report = lesson.run(config).map_err(|err| {
        error!(lesson = lesson.id(), %err, "lesson failed");
        err
    });
    let report = report.with_context(|| format!("lesson '{}' failed", lesson.id()))?;
    println!("\n{} {}", "✓".green(), report);
    print_key_points(lesson);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = LessonConfig::load_or_default(cli.config.as_deref())
        .context("failed to load lesson config")?;
    logging::init(config.level()?).map_err(|err| anyhow::anyhow!(err))?;

    match cli.command {
        Commands::List => {
            for lesson in Lesson::ALL {
                println!(
                    "{:>3}  {:<12} {}",
                    lesson.number(),
                    lesson.id().bold(),
                    lesson.title()
                );
            }
        }
        Commands::Run { lesson } => {
            let lesson: Lesson = lesson.parse()?;
            run_lesson(lesson, &config)?;
        }
        Commands::All => {
            for (i, lesson) in Lesson::ALL.into_iter().enumerate() {
                if i > 0 {
                    println!();
                }
                run_lesson(lesson, &config)?;
            }
        }
    }

    Ok(())
}
