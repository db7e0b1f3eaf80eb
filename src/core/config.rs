//! # Configuration
//!
//! Environment-driven settings with an optional YAML file for the scheduler.
//! Environment variables always win over the file.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Optional `config.yaml` with a `scheduler:` section
//! - 1.0.0: Environment-only configuration

use anyhow::{bail, Context, Result};
use chrono::NaiveTime;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Ten years
const MAX_LOOKBACK_HOURS: i64 = 24 * 365 * 10;

/// Reminder scheduler settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Local wall-clock time of the daily cycle
    pub review_time: NaiveTime,
    /// Post reminders here with a mention; `None` sends DMs
    pub review_channel_id: Option<u64>,
    /// Attempts after the first failed delivery
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub lookback: chrono::Duration,
    pub max_items_per_message: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            review_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or_default(),
            review_channel_id: None,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
            lookback: chrono::Duration::hours(24),
            max_items_per_message: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_path: String,
    pub log_level: String,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    database_path: Option<String>,
    log_level: Option<String>,
    scheduler: FileSchedulerConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSchedulerConfig {
    review_time: Option<String>,
    review_channel_id: Option<u64>,
    retry_attempts: Option<u32>,
    retry_delay_secs: Option<u64>,
    lookback_hours: Option<i64>,
    max_items: Option<usize>,
}

impl Config {
    /// Load from the process environment plus `CONFIG_PATH` (default `config.yaml`) if present
    pub fn from_env() -> Result<Self> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let file = if Path::new(&path).exists() {
            Some(
                std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {path}"))?,
            )
        } else {
            None
        };
        Self::from_sources(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Build from optional YAML text and an environment lookup
    pub fn from_sources<F>(yaml: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match yaml {
            Some(text) if !text.trim().is_empty() => {
                serde_yaml::from_str(text).context("Failed to parse config file")?
            }
            _ => FileConfig::default(),
        };
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let discord_token = env("DISCORD_TOKEN").context("DISCORD_TOKEN must be set")?;
        let database_path = env("DATABASE_PATH")
            .or(file.database_path)
            .unwrap_or_else(|| "grind_review.db".to_string());
        let log_level = env("LOG_LEVEL")
            .or(file.log_level)
            .unwrap_or_else(|| "info".to_string());

        let defaults = SchedulerConfig::default();
        let section = file.scheduler;

        let review_time = match env("REVIEW_TIME").or(section.review_time) {
            Some(value) => parse_review_time(&value)?,
            None => defaults.review_time,
        };
        let review_channel_id =
            parse_var::<u64>(&env, "REVIEW_CHANNEL_ID")?.or(section.review_channel_id);
        let retry_attempts = parse_var::<u32>(&env, "REVIEW_RETRY_ATTEMPTS")?
            .or(section.retry_attempts)
            .unwrap_or(defaults.retry_attempts);
        let retry_delay = parse_var::<u64>(&env, "REVIEW_RETRY_DELAY_SECS")?
            .or(section.retry_delay_secs)
            .map(Duration::from_secs)
            .unwrap_or(defaults.retry_delay);
        let lookback_hours = parse_var::<i64>(&env, "REVIEW_LOOKBACK_HOURS")?
            .or(section.lookback_hours)
            .unwrap_or(defaults.lookback.num_hours());
        let max_items_per_message = parse_var::<usize>(&env, "REVIEW_MAX_ITEMS")?
            .or(section.max_items)
            .unwrap_or(defaults.max_items_per_message);

        if !(1..=MAX_LOOKBACK_HOURS).contains(&lookback_hours) {
            bail!("Review lookback must be 1..={MAX_LOOKBACK_HOURS} hours, got {lookback_hours}");
        }
        let lookback = chrono::Duration::try_hours(lookback_hours)
            .with_context(|| format!("Review lookback of {lookback_hours} hours is out of range"))?;
        if max_items_per_message == 0 {
            bail!("Review max items per message must be at least 1");
        }

        Ok(Self {
            discord_token,
            database_path,
            log_level,
            scheduler: SchedulerConfig {
                review_time,
                review_channel_id,
                retry_attempts,
                retry_delay,
                lookback,
                max_items_per_message,
            },
        })
    }
}

fn parse_review_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .with_context(|| format!("Invalid review time '{value}', expected HH:MM"))
}

fn parse_var<T>(env: impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {key}: '{value}'"))
        })
        .transpose()
}
