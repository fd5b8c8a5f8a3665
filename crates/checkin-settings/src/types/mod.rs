//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may name only the fields it changes.

mod challenge;
mod runtime;
mod slack;

pub use challenge::*;
pub use runtime::*;
pub use slack::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "slack": { "channelId": "C0123" },
///   "challenge": { "cutoff": "23:30", "weekLength": "full" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckinSettings {
    /// Slack credentials and client tuning.
    pub slack: SlackSettings,
    /// Rules of the challenge itself.
    pub challenge: ChallengeSettings,
    /// Daily trigger.
    pub schedule: ScheduleSettings,
    /// Channel command keywords.
    pub commands: CommandSettings,
    /// Where state lives.
    pub storage: StorageSettings,
    /// Log output.
    pub logging: LoggingSettings,
}
