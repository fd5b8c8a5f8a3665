//! Decoded inbound chat events.

use chrono::{DateTime, Utc};

use crate::clock::from_unix_seconds;
use crate::errors::ClockError;
use crate::ids::{ChannelId, MessageTs, UserId};

/// How the event reached the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// The bot was @-mentioned. Treated as a completion attempt.
    Mention,
    /// A plain channel message. Only checked for command keywords.
    Message,
}

/// One inbound event, already stripped of platform envelope details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEvent {
    pub kind: EventKind,
    pub author: UserId,
    pub text: String,
    pub channel: ChannelId,
    /// Timestamp of this message.
    pub ts: MessageTs,
    /// Root of the thread this message was posted in, if any.
    pub thread_ts: Option<MessageTs>,
}

impl ChatEvent {
    /// When the message was posted.
    pub fn posted_at(&self) -> Result<DateTime<Utc>, ClockError> {
        let secs = self
            .ts
            .seconds()
            .ok_or_else(|| ClockError::MalformedTs(self.ts.to_string()))?;
        from_unix_seconds(secs)
    }

    /// Thread to answer in: the enclosing thread, or this message itself.
    pub fn reply_thread(&self) -> &MessageTs {
        self.thread_ts.as_ref().unwrap_or(&self.ts)
    }
}
