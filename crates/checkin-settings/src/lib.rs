//! # checkin-settings
//!
//! Configuration for the checkin bot, loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`CheckinSettings::default()`])
//! 2. **User file** `~/.checkin/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** `SLACK_*` / `CHECKIN_*` overrides (highest priority)
//!
//! [`CheckinSettings::validate`] turns the string-typed fields (zone, times,
//! link pattern) into parsed values.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;
pub mod validate;

pub use errors::{Result, SettingsError};
pub use loader::{
    checkin_home, deep_merge, load_settings, load_settings_from_path, load_settings_with_env,
    settings_path,
};
pub use types::*;
pub use validate::ParsedSettings;

impl CheckinSettings {
    /// Database path: the configured one, else `~/.checkin/checkin.db`.
    pub fn db_path(&self) -> std::path::PathBuf {
        self.storage
            .db_path
            .as_ref()
            .map_or_else(|| checkin_home().join("checkin.db"), std::path::PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = CheckinSettings::default();
        assert_eq!(settings.challenge.completion_reaction, "heart");
        assert_eq!(settings.commands.post, "챌린지 업데이트");
        assert_eq!(settings.commands.delete, "챌린지 삭제");
        assert!(settings.schedule.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn db_path_default_and_override() {
        let mut settings = CheckinSettings::default();
        assert!(settings.db_path().ends_with(".checkin/checkin.db"));
        settings.storage.db_path = Some("/data/x.db".into());
        assert_eq!(settings.db_path(), std::path::PathBuf::from("/data/x.db"));
    }

    #[test]
    fn settings_serialize_camel_case() {
        let json = serde_json::to_value(CheckinSettings::default()).unwrap();
        assert!(json["challenge"]["weekLength"].is_string());
        assert!(json["schedule"]["repostDaily"].is_boolean());
        assert!(json["storage"].get("dbPath").is_none());
    }
}
