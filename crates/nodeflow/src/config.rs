//! Engine configuration.

use nodeflow_core::LogLevel;
use serde::Deserialize;

/// Environment variable holding the log level (integer code or name).
pub const LOG_LEVEL_ENV: &str = "NODEFLOW_LOG_LEVEL";
/// Environment variable holding the concurrency limit.
pub const MAX_PARALLEL_ENV: &str = "NODEFLOW_MAX_PARALLEL";

/// Settings shared by every run of a dispatcher.
///
/// Deserializes from any serde format; missing fields keep their defaults
/// and `log_level` accepts the integer codes of [`LogLevel`].
///
/// # Examples
///
/// ```
/// use nodeflow::{EngineConfig, LogLevel};
///
/// let config = EngineConfig::default();
/// assert_eq!(config.log_level, LogLevel::BaseAndTime);
/// assert_eq!(config.max_parallel, 16);
///
/// let config = EngineConfig::default().with_log_level(LogLevel::No);
/// assert_eq!(config.log_level, LogLevel::No);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Verbosity of node log lines. Default: `BaseAndTime`.
    pub log_level: LogLevel,
    /// Maximum number of nodes running at once. Default: 16.
    pub max_parallel: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::BaseAndTime,
            max_parallel: 16,
        }
    }
}

impl EngineConfig {
    /// Reads `NODEFLOW_LOG_LEVEL` and `NODEFLOW_MAX_PARALLEL`.
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            // Infallible: unknown values coerce to BaseAndTime.
            config.log_level = level.parse().unwrap_or_default();
        }
        match lookup(MAX_PARALLEL_ENV).map(|v| v.trim().parse::<usize>()) {
            Some(Ok(n)) if n > 0 => config.max_parallel = n,
            Some(_) => tracing::warn!(
                "Ignoring invalid {}, keeping {}",
                MAX_PARALLEL_ENV,
                config.max_parallel
            ),
            None => {}
        }
        config
    }

    /// Sets the log level.
    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Sets the concurrency limit. Zero is treated as one.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }
}
