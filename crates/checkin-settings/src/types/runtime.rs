//! Schedule, storage and logging settings.

use serde::{Deserialize, Serialize};

/// Daily trigger settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleSettings {
    /// Run the daily trigger at all.
    pub enabled: bool,
    /// Local `HH:MM` the trigger fires at.
    pub fire_time: String,
    /// Post a new summary message each day instead of editing the existing one.
    pub repost_daily: bool,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            fire_time: "00:01".to_string(),
            repost_daily: false,
        }
    }
}

/// Storage settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// SQLite database path. Defaults to `~/.checkin/checkin.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

/// Log level names accepted in settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level (most verbose).
    Trace,
    /// Debug-level.
    Debug,
    /// Info-level (default).
    #[default]
    Info,
    /// Warning-level.
    Warn,
    /// Error-level.
    Error,
}

impl LogLevel {
    /// Convert to a tracing filter string.
    pub fn as_filter_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Parse a level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Console level. `RUST_LOG` takes precedence when set.
    pub level: LogLevel,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
    /// Persist events into the operator log table.
    pub persist: bool,
    /// Minimum level written to the operator log table.
    pub persist_level: LogLevel,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: false,
            persist: true,
            persist_level: LogLevel::Warn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parse() {
        assert_eq!(LogLevel::parse("WARN"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse(" warning "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn schedule_defaults() {
        let s = ScheduleSettings::default();
        assert!(s.enabled);
        assert_eq!(s.fire_time, "00:01");
        assert!(!s.repost_daily);
    }
}
