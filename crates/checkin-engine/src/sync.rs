//! Message sync controller: keeps one live summary message per week.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use checkin_core::{ChannelId, ChatPlatform, MessageHandle, PlatformError, WeekId};
use checkin_store::WeekStore;

use crate::errors::ChallengeError;

/// Reconciles rendered summaries with the chat channel.
///
/// The stored handle is only replaced after the platform accepted a post, so
/// a failed call never leaves the store pointing at a message that does not
/// exist.
pub struct SummarySync {
    platform: Arc<dyn ChatPlatform>,
    store: Arc<dyn WeekStore>,
    channel: ChannelId,
}

impl SummarySync {
    /// Controller posting into `channel`.
    pub fn new(platform: Arc<dyn ChatPlatform>, store: Arc<dyn WeekStore>, channel: ChannelId) -> Self {
        Self {
            platform,
            store,
            channel,
        }
    }

    /// Show `text` as the week's summary, editing the existing message when
    /// there is one.
    ///
    /// A deleted summary message is replaced with a fresh post. Any other
    /// platform failure is returned as is.
    #[instrument(skip(self, text), fields(week_id = %week, channel = %self.channel))]
    pub async fn sync_summary(&self, week: WeekId, text: &str) -> Result<MessageHandle, ChallengeError> {
        let Some(handle) = self.store.get_handle(week)? else {
            return self.post_new(week, text).await;
        };

        match self.platform.update_message(&handle, text).await {
            Ok(()) => {
                debug!(%handle, "summary updated");
                Ok(handle)
            }
            Err(PlatformError::MessageNotFound) => {
                warn!(%handle, "summary message is gone, posting a replacement");
                self.post_new(week, text).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Post `text` as a new message and make it the week's summary.
    #[instrument(skip(self, text), fields(week_id = %week, channel = %self.channel))]
    pub async fn repost_summary(&self, week: WeekId, text: &str) -> Result<MessageHandle, ChallengeError> {
        self.post_new(week, text).await
    }

    async fn post_new(&self, week: WeekId, text: &str) -> Result<MessageHandle, ChallengeError> {
        let handle = self.platform.post_message(&self.channel, text).await?;
        self.store.put_handle(week, &handle)?;
        info!(%handle, "summary posted");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_slack::MockPlatform;
    use checkin_store::MemoryWeekStore;

    fn week() -> WeekId {
        WeekId::new(2024, 37).unwrap()
    }

    fn setup() -> (Arc<MockPlatform>, Arc<MemoryWeekStore>, SummarySync) {
        let platform = Arc::new(MockPlatform::new("UBOT"));
        let store = Arc::new(MemoryWeekStore::new());
        let sync = SummarySync::new(platform.clone(), store.clone(), ChannelId::from_raw("C1"));
        (platform, store, sync)
    }

    #[tokio::test]
    async fn first_sync_posts_and_stores_handle() {
        let (platform, store, sync) = setup();
        let handle = sync.sync_summary(week(), "v1").await.unwrap();

        assert_eq!(platform.posts(), ["v1"]);
        assert_eq!(store.get_handle(week()).unwrap(), Some(handle.clone()));
        assert_eq!(platform.message_text(&handle).as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn later_syncs_edit_in_place() {
        let (platform, _, sync) = setup();
        let first = sync.sync_summary(week(), "v1").await.unwrap();
        let second = sync.sync_summary(week(), "v2").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(platform.posts().len(), 1);
        assert_eq!(platform.update_count(), 1);
        assert_eq!(platform.message_text(&first).as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn stale_handle_is_replaced_and_next_sync_updates_it() {
        let (platform, store, sync) = setup();
        let old = sync.sync_summary(week(), "v1").await.unwrap();
        platform.delete_message(&old);

        let new = sync.sync_summary(week(), "v2").await.unwrap();
        assert_ne!(old, new);
        assert_eq!(store.get_handle(week()).unwrap(), Some(new.clone()));
        assert_eq!(platform.posts(), ["v1", "v2"]);

        let again = sync.sync_summary(week(), "v3").await.unwrap();
        assert_eq!(again, new);
        assert_eq!(platform.message_text(&new).as_deref(), Some("v3"));
        assert_eq!(platform.posts().len(), 2);
    }

    #[tokio::test]
    async fn other_update_failure_propagates_and_keeps_handle() {
        let (platform, store, sync) = setup();
        let handle = sync.sync_summary(week(), "v1").await.unwrap();
        platform.fail_next_update(PlatformError::Api {
            method: "chat.update",
            code: "cant_update_message".into(),
        });

        let err = sync.sync_summary(week(), "v2").await.unwrap_err();
        assert!(matches!(err, ChallengeError::Platform(PlatformError::Api { .. })));
        assert_eq!(store.get_handle(week()).unwrap(), Some(handle));
        assert_eq!(platform.posts().len(), 1);
    }

    #[tokio::test]
    async fn failed_post_stores_nothing() {
        let (platform, store, sync) = setup();
        platform.fail_next_post(PlatformError::Network("reset".into()));

        assert!(sync.sync_summary(week(), "v1").await.is_err());
        assert_eq!(store.get_handle(week()).unwrap(), None);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn repost_always_posts_fresh() {
        let (platform, store, sync) = setup();
        let first = sync.sync_summary(week(), "mon").await.unwrap();
        let second = sync.repost_summary(week(), "tue").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(platform.posts(), ["mon", "tue"]);
        assert_eq!(store.get_handle(week()).unwrap(), Some(second));
    }
}
