use std::time::Duration;

use crate::error::AppError;
use crate::util::parse_duration;

/// Tuning knobs for the harvesting engine.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Number of concurrent article workers.
    pub workers: usize,
    /// Poll interval every source starts with.
    pub default_interval: Duration,
    /// Period of the flush loop, independent of any source interval.
    pub flush_interval: Duration,
    /// Slots in the work distribution channel.
    pub queue_capacity: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            default_interval: Duration::from_secs(3600),
            flush_interval: Duration::from_secs(30),
            queue_capacity: 1,
        }
    }
}

impl HarvestConfig {
    /// Read configuration from environment variables.
    ///
    /// - `TRAWL_WORKERS` (optional, defaults to 4)
    /// - `TRAWL_DEFAULT_INTERVAL` (optional, e.g. `"30m"`, defaults to `1h`)
    /// - `TRAWL_FLUSH_INTERVAL` (optional, defaults to `30s`)
    /// - `TRAWL_QUEUE_CAPACITY` (optional, defaults to 1)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let workers = match lookup("TRAWL_WORKERS") {
            None => defaults.workers,
            Some(raw) => positive_count("TRAWL_WORKERS", &raw)?,
        };
        let queue_capacity = match lookup("TRAWL_QUEUE_CAPACITY") {
            None => defaults.queue_capacity,
            Some(raw) => positive_count("TRAWL_QUEUE_CAPACITY", &raw)?,
        };
        let default_interval = match lookup("TRAWL_DEFAULT_INTERVAL") {
            None => defaults.default_interval,
            Some(raw) => env_duration("TRAWL_DEFAULT_INTERVAL", &raw)?,
        };
        let flush_interval = match lookup("TRAWL_FLUSH_INTERVAL") {
            None => defaults.flush_interval,
            Some(raw) => env_duration("TRAWL_FLUSH_INTERVAL", &raw)?,
        };

        Ok(Self {
            workers,
            default_interval,
            flush_interval,
            queue_capacity,
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

fn positive_count(key: &str, raw: &str) -> Result<usize, AppError> {
    let parsed: usize = raw.trim().parse().map_err(|_| {
        AppError::ConfigError(format!("Invalid {key} '{raw}': must be a positive integer"))
    })?;
    if parsed == 0 {
        return Err(AppError::ConfigError(format!("{key} must be at least 1")));
    }
    Ok(parsed)
}

fn env_duration(key: &str, raw: &str) -> Result<Duration, AppError> {
    parse_duration(raw).map_err(|e| AppError::ConfigError(format!("Invalid {key}: {e}")))
}
