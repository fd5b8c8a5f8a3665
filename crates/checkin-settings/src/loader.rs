//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`CheckinSettings::default()`]
//! 2. If `~/.checkin/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{CheckinSettings, LogLevel};

/// `~/.checkin`, or `/tmp/.checkin` when `HOME` is unset.
pub fn checkin_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".checkin")
}

/// Resolve the path to the settings file (`~/.checkin/settings.json`).
pub fn settings_path() -> PathBuf {
    checkin_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<CheckinSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with process env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<CheckinSettings> {
    load_settings_with_env(path, |name| std::env::var(name).ok())
}

/// Same as [`load_settings_from_path`] with env lookups served by `env`.
pub fn load_settings_with_env<F>(path: &Path, env: F) -> Result<CheckinSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(CheckinSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: CheckinSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, &env);
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Empty values are ignored. Booleans accept `true`/`1`/`yes`/`on` or
/// `false`/`0`/`no`/`off`; anything else is logged and ignored.
pub fn apply_env_overrides<F>(settings: &mut CheckinSettings, env: &F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| env(name).filter(|v| !v.is_empty());

    // ── Slack ───────────────────────────────────────────────────────
    if let Some(v) = read("SLACK_BOT_TOKEN") {
        settings.slack.bot_token = v;
    }
    if let Some(v) = read("SLACK_APP_TOKEN") {
        settings.slack.app_token = v;
    }
    if let Some(v) = read("CHECKIN_CHANNEL_ID") {
        settings.slack.channel_id = v;
    }

    // ── Challenge ───────────────────────────────────────────────────
    if let Some(v) = read("CHECKIN_TIMEZONE") {
        settings.challenge.timezone = v;
    }
    if let Some(v) = read("CHECKIN_CUTOFF") {
        settings.challenge.cutoff = v;
    }
    if let Some(v) = read("CHECKIN_FIRE_TIME") {
        settings.schedule.fire_time = v;
    }

    // ── Storage / logging ───────────────────────────────────────────
    if let Some(v) = read("CHECKIN_DB_PATH") {
        settings.storage.db_path = Some(v);
    }
    if let Some(v) = read("CHECKIN_LOG_LEVEL") {
        match LogLevel::parse(&v) {
            Some(level) => settings.logging.level = level,
            None => tracing::warn!(key = "CHECKIN_LOG_LEVEL", value = %v, "invalid log level env var, ignoring"),
        }
    }
    if let Some(v) = read("CHECKIN_LOG_JSON") {
        match parse_bool(&v) {
            Some(json) => settings.logging.json = json,
            None => tracing::warn!(key = "CHECKIN_LOG_JSON", value = %v, "invalid boolean env var, ignoring"),
        }
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use checkin_core::WeekLength;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"challenge": {"cutoff": "23:59", "timezone": "Asia/Seoul"}});
        let source = serde_json::json!({"challenge": {"cutoff": "22:00"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["challenge"]["cutoff"], "22:00");
        assert_eq!(merged["challenge"]["timezone"], "Asia/Seoul");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"excludedUsers": ["U1", "U2"]});
        let source = serde_json::json!({"excludedUsers": ["U3"]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["excludedUsers"], serde_json::json!(["U3"]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
    }

    // ── load_settings_with_env ──────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let path = Path::new("/nonexistent/settings.json");
        let settings = load_settings_with_env(path, no_env).unwrap();
        assert_eq!(settings.challenge.timezone, "Asia/Seoul");
        assert_eq!(settings.challenge.cutoff, "23:59");
        assert_eq!(settings.schedule.fire_time, "00:01");
        assert_eq!(settings.commands.start, "챌린지 시작");
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"challenge": {"weekLength": "full", "excludedUsers": ["U9"]}, "slack": {"channelId": "C42"}}"#,
        )
        .unwrap();

        let settings = load_settings_with_env(&path, no_env).unwrap();
        assert_eq!(settings.challenge.week_length, WeekLength::Full);
        assert_eq!(settings.challenge.excluded_users, ["U9"]);
        assert_eq!(settings.slack.channel_id, "C42");
        assert_eq!(settings.challenge.cutoff, "23:59");
        assert_eq!(settings.slack.api_base_url, "https://slack.com/api");
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_settings_with_env(&path, no_env);
        assert!(matches!(result.unwrap_err(), SettingsError::Json(_)));
    }

    #[test]
    fn env_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"challenge": {"cutoff": "22:00"}}"#).unwrap();

        let env = env_of(&[
            ("CHECKIN_CUTOFF", "21:30"),
            ("SLACK_BOT_TOKEN", "xoxb-test"),
            ("CHECKIN_DB_PATH", "/var/lib/checkin.db"),
            ("CHECKIN_LOG_JSON", "yes"),
            ("CHECKIN_LOG_LEVEL", "debug"),
        ]);
        let settings = load_settings_with_env(&path, env).unwrap();
        assert_eq!(settings.challenge.cutoff, "21:30");
        assert_eq!(settings.slack.bot_token, "xoxb-test");
        assert_eq!(settings.storage.db_path.as_deref(), Some("/var/lib/checkin.db"));
        assert!(settings.logging.json);
        assert_eq!(settings.logging.level, LogLevel::Debug);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let env = env_of(&[("CHECKIN_LOG_JSON", "maybe"), ("CHECKIN_TIMEZONE", "")]);
        let settings = load_settings_with_env(Path::new("/nonexistent"), env).unwrap();
        assert!(!settings.logging.json);
        assert_eq!(settings.challenge.timezone, "Asia/Seoul");
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn settings_path_under_checkin_home() {
        assert!(settings_path().ends_with(".checkin/settings.json"));
    }
}
