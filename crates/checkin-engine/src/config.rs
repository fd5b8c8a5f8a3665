//! Runtime configuration of the engine, built from validated settings.

use chrono::NaiveTime;
use chrono_tz::Tz;
use regex::Regex;

use checkin_core::{ChannelId, Locale, SlotPolicy, UserId, WeekLength};
use checkin_settings::{CheckinSettings, ParsedSettings};

use crate::trigger::CommandKeywords;

/// Everything the engine needs to know about the challenge.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub struct EngineConfig {
    /// The one channel the challenge lives in.
    pub channel: ChannelId,
    /// Zone weeks, days and the cutoff are computed in.
    pub zone: Tz,
    /// Completions at or after this local time are refused.
    pub cutoff: NaiveTime,
    /// Local time of the daily scheduler run.
    pub fire_time: NaiveTime,
    pub week_length: WeekLength,
    pub slot_policy: SlotPolicy,
    /// Language of summaries and replies.
    pub locale: Locale,
    /// A completion mention must contain a match.
    pub link_pattern: Regex,
    /// Reaction name added to accepted completions.
    pub completion_reaction: String,
    /// Never part of a membership snapshot.
    pub excluded_users: Vec<UserId>,
    /// Post a new summary every day instead of editing the week's message.
    pub repost_daily: bool,
    /// Channel command keywords.
    pub commands: CommandKeywords,
}

impl EngineConfig {
    /// Combine raw and parsed settings.
    pub fn from_settings(settings: &CheckinSettings, parsed: &ParsedSettings) -> Self {
        let challenge = &settings.challenge;
        Self {
            channel: ChannelId::from_raw(settings.slack.channel_id.as_str()),
            zone: parsed.zone,
            cutoff: parsed.cutoff,
            fire_time: parsed.fire_time,
            week_length: challenge.week_length,
            slot_policy: challenge.slot_policy,
            locale: challenge.locale,
            link_pattern: parsed.link_pattern.clone(),
            completion_reaction: challenge.completion_reaction.clone(),
            excluded_users: challenge
                .excluded_users
                .iter()
                .map(|u| UserId::from_raw(u.as_str()))
                .collect(),
            repost_daily: settings.schedule.repost_daily,
            commands: CommandKeywords {
                start: settings.commands.start.clone(),
                post: settings.commands.post.clone(),
                delete: settings.commands.delete.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_through() {
        let mut settings = CheckinSettings::default();
        settings.slack.channel_id = "C1".into();
        settings.challenge.excluded_users = vec!["U9".into()];
        let config = EngineConfig::from_settings(&settings, &settings.validate().unwrap());

        assert_eq!(config.channel.as_str(), "C1");
        assert_eq!(config.zone, chrono_tz::Asia::Seoul);
        assert_eq!(config.cutoff, NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        assert_eq!(config.fire_time, NaiveTime::from_hms_opt(0, 1, 0).unwrap());
        assert_eq!(config.week_length, WeekLength::Business);
        assert_eq!(config.slot_policy, SlotPolicy::Today);
        assert_eq!(config.excluded_users, [UserId::from_raw("U9")]);
        assert_eq!(config.commands.start, "챌린지 시작");
        assert!(!config.repost_daily);
    }
}
