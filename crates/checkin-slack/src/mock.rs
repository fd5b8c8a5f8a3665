//! In-process [`ChatPlatform`] double.
//!
//! Keeps the "channel" in memory, records every call, and lets tests delete
//! messages or inject failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use checkin_core::{ChannelId, ChatPlatform, MessageHandle, MessageTs, PlatformError, UserId};

/// One recorded platform call.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PlatformCall {
    Identity,
    ListMembers(ChannelId),
    DisplayName(UserId),
    Post { channel: ChannelId, text: String },
    Update { handle: MessageHandle, text: String },
    React { handle: MessageHandle, reaction: String },
    Reply { channel: ChannelId, thread_ts: MessageTs, text: String },
}

/// Scriptable chat platform.
pub struct MockPlatform {
    bot: UserId,
    members: Mutex<Vec<(UserId, String)>>,
    messages: Mutex<HashMap<MessageHandle, String>>,
    calls: Mutex<Vec<PlatformCall>>,
    next_ts: AtomicU64,
    next_update_error: Mutex<Option<PlatformError>>,
    next_post_error: Mutex<Option<PlatformError>>,
}

impl MockPlatform {
    /// Empty channel whose bot user is `bot`. The bot is a channel member.
    pub fn new(bot: &str) -> Self {
        Self {
            bot: UserId::from_raw(bot),
            members: Mutex::new(vec![(UserId::from_raw(bot), "checkin".to_string())]),
            messages: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            next_ts: AtomicU64::new(1),
            next_update_error: Mutex::new(None),
            next_post_error: Mutex::new(None),
        }
    }

    /// Add a channel member.
    #[must_use]
    pub fn with_member(self, id: &str, name: &str) -> Self {
        self.add_member(id, name);
        self
    }

    /// Add a channel member after construction.
    pub fn add_member(&self, id: &str, name: &str) {
        self.members
            .lock()
            .push((UserId::from_raw(id), name.to_string()));
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Current text of a live message.
    pub fn message_text(&self, handle: &MessageHandle) -> Option<String> {
        self.messages.lock().get(handle).cloned()
    }

    /// Simulate someone deleting a message in the channel.
    pub fn delete_message(&self, handle: &MessageHandle) {
        let _ = self.messages.lock().remove(handle);
    }

    /// Fail the next `update_message` with `err`.
    pub fn fail_next_update(&self, err: PlatformError) {
        *self.next_update_error.lock() = Some(err);
    }

    /// Fail the next `post_message` with `err`.
    pub fn fail_next_post(&self, err: PlatformError) {
        *self.next_post_error.lock() = Some(err);
    }

    /// Top-level posts, in order.
    pub fn posts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                PlatformCall::Post { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Thread replies, in order.
    pub fn replies(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                PlatformCall::Reply { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Reactions added, as `(message ts, name)`.
    pub fn reactions(&self) -> Vec<(MessageTs, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                PlatformCall::React { handle, reaction } => Some((handle.ts.clone(), reaction.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of `update_message` calls, successful or not.
    pub fn update_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, PlatformCall::Update { .. }))
            .count()
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().push(call);
    }

    fn new_handle(&self, channel: &ChannelId) -> MessageHandle {
        let n = self.next_ts.fetch_add(1, Ordering::SeqCst);
        MessageHandle::new(
            channel.clone(),
            MessageTs::from_raw(format!("1700000000.{n:06}")),
        )
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn identity(&self) -> Result<UserId, PlatformError> {
        self.record(PlatformCall::Identity);
        Ok(self.bot.clone())
    }

    async fn list_channel_members(&self, channel: &ChannelId) -> Result<Vec<UserId>, PlatformError> {
        self.record(PlatformCall::ListMembers(channel.clone()));
        Ok(self.members.lock().iter().map(|(id, _)| id.clone()).collect())
    }

    async fn display_name(&self, user: &UserId) -> Result<String, PlatformError> {
        self.record(PlatformCall::DisplayName(user.clone()));
        self.members
            .lock()
            .iter()
            .find(|(id, _)| id == user)
            .map(|(_, name)| name.clone())
            .ok_or_else(|| PlatformError::Api {
                method: "users.info",
                code: "user_not_found".into(),
            })
    }

    async fn post_message(&self, channel: &ChannelId, text: &str) -> Result<MessageHandle, PlatformError> {
        self.record(PlatformCall::Post {
            channel: channel.clone(),
            text: text.to_string(),
        });
        if let Some(err) = self.next_post_error.lock().take() {
            return Err(err);
        }
        let handle = self.new_handle(channel);
        let _ = self.messages.lock().insert(handle.clone(), text.to_string());
        Ok(handle)
    }

    async fn update_message(&self, handle: &MessageHandle, text: &str) -> Result<(), PlatformError> {
        self.record(PlatformCall::Update {
            handle: handle.clone(),
            text: text.to_string(),
        });
        if let Some(err) = self.next_update_error.lock().take() {
            return Err(err);
        }
        let mut messages = self.messages.lock();
        let slot = messages
            .get_mut(handle)
            .ok_or(PlatformError::MessageNotFound)?;
        *slot = text.to_string();
        Ok(())
    }

    async fn add_reaction(&self, handle: &MessageHandle, reaction: &str) -> Result<(), PlatformError> {
        self.record(PlatformCall::React {
            handle: handle.clone(),
            reaction: reaction.to_string(),
        });
        Ok(())
    }

    async fn post_reply(
        &self,
        channel: &ChannelId,
        thread_ts: &MessageTs,
        text: &str,
    ) -> Result<MessageHandle, PlatformError> {
        self.record(PlatformCall::Reply {
            channel: channel.clone(),
            thread_ts: thread_ts.clone(),
            text: text.to_string(),
        });
        Ok(self.new_handle(channel))
    }
}
