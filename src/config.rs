//! Lesson configuration, read from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! numbers the lessons were written with.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::Level;

use crate::error::ConfigError;

const MAX_UNITS: u64 = 10_000;
const MAX_CAPACITY: u64 = 4_096;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LessonConfig {
    pub log_level: String,
    pub goroutines: GoroutinesConfig,
    pub waitgroup: WaitGroupConfig,
    pub channels: ChannelsConfig,
    pub mutex: MutexConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GoroutinesConfig {
    pub tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaitGroupConfig {
    pub tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelsConfig {
    pub number: i32,
    pub sum_operands: [i32; 2],
    pub buffer_capacity: usize,
    pub email_queue_capacity: usize,
    pub emails: usize,
    pub email_delay_ms: u64,
    pub select_number: i32,
    pub select_text: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MutexConfig {
    pub workers: usize,
    pub show_race: bool,
    pub race_increments: usize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
}

impl Default for LessonConfig {
    fn default() -> Self {
        LessonConfig {
            log_level: "info".to_string(),
            goroutines: GoroutinesConfig::default(),
            waitgroup: WaitGroupConfig::default(),
            channels: ChannelsConfig::default(),
            mutex: MutexConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Default for GoroutinesConfig {
    fn default() -> Self {
        GoroutinesConfig { tasks: 11 }
    }
}

impl Default for WaitGroupConfig {
    fn default() -> Self {
        WaitGroupConfig { tasks: 11 }
    }
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        ChannelsConfig {
            number: 42,
            sum_operands: [10, 20],
            buffer_capacity: 10,
            email_queue_capacity: 50,
            emails: 4,
            email_delay_ms: 1_000,
            select_number: 10,
            select_text: "hello".to_string(),
        }
    }
}

impl ChannelsConfig {
    pub fn email_delay(&self) -> Duration {
        Duration::from_millis(self.email_delay_ms)
    }
}

impl Default for MutexConfig {
    fn default() -> Self {
        MutexConfig {
            workers: 100,
            show_race: true,
            race_increments: 1_000,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig { worker_threads: 4 }
    }
}

fn check_range(field: &'static str, value: usize, min: u64, max: u64) -> Result<(), ConfigError> {
    let value = value as u64;
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl LessonConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: LessonConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.level()?;
        check_range("goroutines.tasks", self.goroutines.tasks, 0, MAX_UNITS)?;
        check_range("waitgroup.tasks", self.waitgroup.tasks, 0, MAX_UNITS)?;
        // The buffered demo sends three values before anyone receives.
        check_range(
            "channels.buffer_capacity",
            self.channels.buffer_capacity,
            3,
            MAX_CAPACITY,
        )?;
        check_range(
            "channels.email_queue_capacity",
            self.channels.email_queue_capacity,
            0,
            MAX_CAPACITY,
        )?;
        check_range("channels.emails", self.channels.emails, 0, MAX_UNITS)?;
        check_range(
            "channels.email_delay_ms",
            self.channels.email_delay_ms as usize,
            0,
            60_000,
        )?;
        check_range("mutex.workers", self.mutex.workers, 0, MAX_UNITS)?;
        check_range(
            "mutex.race_increments",
            self.mutex.race_increments,
            0,
            1_000_000,
        )?;
        check_range("runtime.worker_threads", self.runtime.worker_threads, 1, 256)?;
        Ok(())
    }

    pub fn level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}
