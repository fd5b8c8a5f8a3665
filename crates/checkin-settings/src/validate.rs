//! Parsing of the string-typed settings into the values the engine runs on.

use chrono::NaiveTime;
use chrono_tz::Tz;
use regex::Regex;

use checkin_core::clock::parse_time_of_day;

use crate::errors::{Result, SettingsError};
use crate::types::CheckinSettings;

/// Settings fields that needed parsing, parsed.
#[derive(Clone, Debug)]
pub struct ParsedSettings {
    /// Challenge time zone.
    pub zone: Tz,
    /// Daily submission cutoff.
    pub cutoff: NaiveTime,
    /// Daily trigger time.
    pub fire_time: NaiveTime,
    /// Qualifying-link matcher.
    pub link_pattern: Regex,
}

impl CheckinSettings {
    /// Parse and check every derived value.
    pub fn validate(&self) -> Result<ParsedSettings> {
        let zone: Tz = self.challenge.timezone.parse().map_err(|_| {
            SettingsError::InvalidValue(format!(
                "challenge.timezone: unknown zone {:?}",
                self.challenge.timezone
            ))
        })?;
        let cutoff = parse_time_of_day(&self.challenge.cutoff)
            .map_err(|e| SettingsError::InvalidValue(format!("challenge.cutoff: {e}")))?;
        let fire_time = parse_time_of_day(&self.schedule.fire_time)
            .map_err(|e| SettingsError::InvalidValue(format!("schedule.fireTime: {e}")))?;
        let link_pattern = Regex::new(&self.challenge.link_pattern)
            .map_err(|e| SettingsError::InvalidValue(format!("challenge.linkPattern: {e}")))?;

        for (field, keyword) in [
            ("commands.start", &self.commands.start),
            ("commands.post", &self.commands.post),
            ("commands.delete", &self.commands.delete),
        ] {
            if keyword.trim().is_empty() {
                return Err(SettingsError::InvalidValue(format!("{field} is empty")));
            }
        }

        Ok(ParsedSettings {
            zone,
            cutoff,
            fire_time,
            link_pattern,
        })
    }

    /// Check the Slack credentials needed to talk to the workspace.
    pub fn require_slack(&self, socket_mode: bool) -> Result<()> {
        if self.slack.bot_token.is_empty() {
            return Err(SettingsError::InvalidValue(
                "slack.botToken is not set (SLACK_BOT_TOKEN)".into(),
            ));
        }
        if self.slack.channel_id.is_empty() {
            return Err(SettingsError::InvalidValue(
                "slack.channelId is not set (CHECKIN_CHANNEL_ID)".into(),
            ));
        }
        if socket_mode && self.slack.app_token.is_empty() {
            return Err(SettingsError::InvalidValue(
                "slack.appToken is not set (SLACK_APP_TOKEN)".into(),
            ));
        }
        Ok(())
    }
}
