use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::PlatformError;
use crate::ids::{ChannelId, MessageTs, UserId};

/// Reference to one posted message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle {
    /// Channel the message lives in.
    pub channel: ChannelId,
    /// Message timestamp (its id within the channel).
    pub ts: MessageTs,
}

impl MessageHandle {
    /// Build a handle.
    pub fn new(channel: ChannelId, ts: MessageTs) -> Self {
        Self { channel, ts }
    }
}

impl std::fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.channel, self.ts)
    }
}

/// Chat platform operations the bot relies on (Slack in production).
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The bot's own user id.
    async fn identity(&self) -> Result<UserId, PlatformError>;

    /// Every member of a channel, in platform order.
    async fn list_channel_members(&self, channel: &ChannelId) -> Result<Vec<UserId>, PlatformError>;

    /// Human-readable name for a user.
    async fn display_name(&self, user: &UserId) -> Result<String, PlatformError>;

    /// Post a top-level message.
    async fn post_message(&self, channel: &ChannelId, text: &str) -> Result<MessageHandle, PlatformError>;

    /// Replace the text of an existing message.
    /// Fails with [`PlatformError::MessageNotFound`] when the message is gone.
    async fn update_message(&self, handle: &MessageHandle, text: &str) -> Result<(), PlatformError>;

    /// React to a message.
    async fn add_reaction(&self, handle: &MessageHandle, reaction: &str) -> Result<(), PlatformError>;

    /// Reply inside the thread rooted at `thread_ts`.
    async fn post_reply(
        &self,
        channel: &ChannelId,
        thread_ts: &MessageTs,
        text: &str,
    ) -> Result<MessageHandle, PlatformError>;
}
