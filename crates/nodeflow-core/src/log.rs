//! Log verbosity and the per-execution node log buffer.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Prefix of every node log line.
pub const NODE_LOG: &str = "nodeLog ";

/// How much detail node executions log.
///
/// Levels are ordered: every level includes everything logged by the levels
/// below it. Integer codes outside `1..=4` coerce to
/// [`LogLevel::BaseAndTime`] rather than silencing the log.
///
/// # Examples
///
/// ```
/// use nodeflow_core::LogLevel;
///
/// assert_eq!(LogLevel::from_code(1), LogLevel::No);
/// assert_eq!(LogLevel::from_code(4), LogLevel::BaseAndTimeAndParams);
/// assert_eq!(LogLevel::from_code(42), LogLevel::BaseAndTime);
/// assert!(LogLevel::Base < LogLevel::BaseAndTime);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "i64", into = "i64")]
pub enum LogLevel {
    /// Nothing is logged on success.
    No = 1,
    /// Chain name, node name and skip flag.
    Base = 2,
    /// [`Base`](Self::Base) plus elapsed time.
    #[default]
    BaseAndTime = 3,
    /// [`BaseAndTime`](Self::BaseAndTime) plus serialized context snapshots.
    BaseAndTimeAndParams = 4,
}

impl LogLevel {
    /// Parses an integer code, coercing unknown codes to [`LogLevel::BaseAndTime`].
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => LogLevel::No,
            2 => LogLevel::Base,
            3 => LogLevel::BaseAndTime,
            4 => LogLevel::BaseAndTimeAndParams,
            _ => LogLevel::BaseAndTime,
        }
    }

    /// Returns the integer code.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Returns `true` if a fragment tagged with `min` is included at this level.
    pub fn includes(self, min: LogLevel) -> bool {
        self != LogLevel::No && min <= self
    }
}

impl From<i64> for LogLevel {
    fn from(code: i64) -> Self {
        Self::from_code(code)
    }
}

impl From<LogLevel> for i64 {
    fn from(level: LogLevel) -> Self {
        level.code()
    }
}

/// Accepts an integer code or a level name; anything else is `BaseAndTime`.
impl FromStr for LogLevel {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return Ok(Self::from_code(code));
        }
        let level = match s.to_ascii_uppercase().as_str() {
            "NO" => LogLevel::No,
            "BASE" => LogLevel::Base,
            "BASE_AND_TIME" => LogLevel::BaseAndTime,
            "BASE_AND_TIME_AND_PARAMS" => LogLevel::BaseAndTimeAndParams,
            _ => LogLevel::BaseAndTime,
        };
        Ok(level)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::No => "NO",
            LogLevel::Base => "BASE",
            LogLevel::BaseAndTime => "BASE_AND_TIME",
            LogLevel::BaseAndTimeAndParams => "BASE_AND_TIME_AND_PARAMS",
        };
        f.write_str(s)
    }
}

/// Buffer that collects the fragments of one node execution into a single line.
///
/// Fragments are kept only if the configured level includes them. The line
/// is written once, by [`flush`](Self::flush), and the buffer is emptied.
#[derive(Debug)]
pub struct NodeLog {
    level: LogLevel,
    buf: String,
}

impl NodeLog {
    /// Starts a line for the run identified by `log_str`.
    pub fn new(level: LogLevel, log_str: &str) -> Self {
        let mut buf = String::with_capacity(128);
        buf.push_str(NODE_LOG);
        buf.push_str(log_str);
        Self { level, buf }
    }

    /// Returns `true` if fragments tagged with `min` will be kept.
    pub fn enabled(&self, min: LogLevel) -> bool {
        self.level.includes(min)
    }

    /// Appends `fragments` if the level includes `min`.
    pub fn append(&mut self, min: LogLevel, fragments: &[&str]) {
        if self.enabled(min) {
            fragments.iter().for_each(|f| self.buf.push_str(f));
        }
    }

    /// Appends `key` and a lazily computed value if the level includes `min`.
    ///
    /// `value` is never called when the fragment is filtered out.
    pub fn append_with<F>(&mut self, min: LogLevel, key: &str, value: F)
    where
        F: FnOnce() -> String,
    {
        if self.enabled(min) {
            self.buf.push_str(key);
            self.buf.push_str(&value());
        }
    }

    /// Emits the line and empties the buffer.
    ///
    /// Returns the emitted line, or `None` at [`LogLevel::No`].
    pub fn flush(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buf);
        if self.level == LogLevel::No {
            return None;
        }
        tracing::info!(target: "nodeflow::node", "{}", line);
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_includes() {
        assert!(!LogLevel::No.includes(LogLevel::No));
        assert!(!LogLevel::No.includes(LogLevel::Base));
        assert!(LogLevel::Base.includes(LogLevel::Base));
        assert!(!LogLevel::Base.includes(LogLevel::BaseAndTime));
        assert!(LogLevel::BaseAndTimeAndParams.includes(LogLevel::BaseAndTime));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("2".parse::<LogLevel>(), Ok(LogLevel::Base));
        assert_eq!("0".parse::<LogLevel>(), Ok(LogLevel::BaseAndTime));
        assert_eq!(
            "base_and_time_and_params".parse::<LogLevel>(),
            Ok(LogLevel::BaseAndTimeAndParams)
        );
        assert_eq!(" NO ".parse::<LogLevel>(), Ok(LogLevel::No));
        assert_eq!("verbose".parse::<LogLevel>(), Ok(LogLevel::BaseAndTime));
    }

    #[test]
    fn test_serde_codes() {
        let level: LogLevel = serde_json::from_str("4").expect("valid json");
        assert_eq!(level, LogLevel::BaseAndTimeAndParams);
        let level: LogLevel = serde_json::from_str("-3").expect("valid json");
        assert_eq!(level, LogLevel::BaseAndTime);
        assert_eq!(
            serde_json::to_string(&LogLevel::Base).expect("serializable"),
            "2"
        );
    }

    #[test]
    fn test_buffer_filters_and_clears() {
        let mut log = NodeLog::new(LogLevel::Base, "run-1");
        log.append(LogLevel::Base, &[" nodeName=", "A"]);
        log.append(LogLevel::BaseAndTime, &[" time=", "5"]);
        log.append_with(LogLevel::BaseAndTimeAndParams, " params=", || {
            unreachable!("filtered fragment must not be computed")
        });

        assert_eq!(log.flush().as_deref(), Some("nodeLog run-1 nodeName=A"));
        assert_eq!(log.flush().as_deref(), Some(""));
    }

    #[test]
    fn test_buffer_silent_at_no() {
        let mut log = NodeLog::new(LogLevel::No, "run-1");
        log.append(LogLevel::Base, &[" nodeName=", "A"]);
        assert_eq!(log.flush(), None);
    }
}
