//! Challenge rules and channel commands.

use checkin_core::{Locale, SlotPolicy, WeekLength};
use serde::{Deserialize, Serialize};

/// Rules of the weekly challenge.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChallengeSettings {
    /// IANA zone every week and cutoff is computed in.
    pub timezone: String,
    /// Local `HH:MM` at and after which completions are refused.
    pub cutoff: String,
    /// Five business days or the full seven.
    pub week_length: WeekLength,
    /// Which cell a completion marks.
    pub slot_policy: SlotPolicy,
    /// Language of posted text.
    pub locale: Locale,
    /// A mention must match this to count as a completion.
    pub link_pattern: String,
    /// Reaction added to an accepted completion.
    pub completion_reaction: String,
    /// User ids never included in a membership snapshot.
    pub excluded_users: Vec<String>,
}

impl Default for ChallengeSettings {
    fn default() -> Self {
        Self {
            timezone: "Asia/Seoul".to_string(),
            cutoff: "23:59".to_string(),
            week_length: WeekLength::Business,
            slot_policy: SlotPolicy::Today,
            locale: Locale::Ko,
            link_pattern: r"https?://[^\s>|]+".to_string(),
            completion_reaction: "heart".to_string(),
            excluded_users: Vec::new(),
        }
    }
}

/// Keywords recognized in plain channel messages.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandSettings {
    /// Starts (or restarts) the current week.
    pub start: String,
    /// Re-publishes the current week's summary.
    pub post: String,
    /// Deletes the current week's record.
    pub delete: String,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            start: "챌린지 시작".to_string(),
            post: "챌린지 업데이트".to_string(),
            delete: "챌린지 삭제".to_string(),
        }
    }
}
