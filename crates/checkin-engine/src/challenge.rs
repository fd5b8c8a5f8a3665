//! The challenge service: every operation on the current week, each one run
//! under that week's lock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};

use checkin_core::clock::{is_past_cutoff, resolve};
use checkin_core::render::render;
use checkin_core::{
    ChatPlatform, DaySlot, MarkOutcome, MessageHandle, UserId, WeekContext, WeekRecord,
};
use checkin_store::WeekStore;

use crate::book::{AttendanceBook, DeleteOutcome};
use crate::config::EngineConfig;
use crate::errors::ChallengeError;
use crate::locks::WeekLocks;
use crate::sync::SummarySync;

/// How a summary reaches the channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Publish {
    /// Edit the week's message, posting only if it is missing.
    Sync,
    /// Always post a new message.
    Repost,
}

/// State machine, sync controller and locks for one channel.
pub struct Challenge {
    config: EngineConfig,
    platform: Arc<dyn ChatPlatform>,
    book: AttendanceBook,
    sync: SummarySync,
    locks: WeekLocks,
}

impl Challenge {
    /// Service for `config.channel` over `platform` and `store`.
    pub fn new(config: EngineConfig, platform: Arc<dyn ChatPlatform>, store: Arc<dyn WeekStore>) -> Self {
        let sync = SummarySync::new(platform.clone(), store.clone(), config.channel.clone());
        Self {
            book: AttendanceBook::new(store),
            sync,
            locks: WeekLocks::new(),
            platform,
            config,
        }
    }

    /// Configuration in effect.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying state machine.
    pub fn book(&self) -> &AttendanceBook {
        &self.book
    }

    /// Calendar facts for `at` in the challenge zone.
    pub fn context(&self, at: DateTime<Utc>) -> WeekContext {
        resolve(at, self.config.zone)
    }

    /// Credit `author` for the day of `at`.
    ///
    /// Cheap checks come first: cutoff, link, and today's slot are all
    /// decided before any store read or platform call. The summary is synced
    /// first and the matrix persisted only after it succeeded, so a failed
    /// sync leaves the week unchanged.
    #[instrument(skip(self, link), fields(user = %author))]
    pub async fn complete(
        &self,
        author: &UserId,
        link: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<MarkOutcome, ChallengeError> {
        let ctx = self.context(at);
        if is_past_cutoff(ctx.local_time, self.config.cutoff) {
            return Err(ChallengeError::SubmissionClosed);
        }
        if link.is_none() {
            return Err(ChallengeError::MissingQualifyingContent);
        }
        let today = DaySlot::for_weekday(ctx.weekday_index, self.config.week_length)
            .ok_or(ChallengeError::NoSlotToday)?;

        let participant = self.platform.display_name(author).await?;

        let _guard = self.locks.lock(ctx.week_id).await;
        let staged =
            self.book
                .stage_completion(ctx.week_id, &participant, today, self.config.slot_policy)?;

        if let Some(record) = staged.record {
            let text = render(&ctx, &record, self.config.locale);
            if let Err(e) = self.sync.sync_summary(ctx.week_id, &text).await {
                error!(
                    week_id = %ctx.week_id,
                    participant = %participant,
                    error = %e,
                    "summary sync failed, completion not recorded"
                );
                return Err(e);
            }
            self.book.commit(ctx.week_id, record)?;
        }
        Ok(staged.outcome)
    }

    /// Initialize the week of `at` from a fresh membership snapshot and post
    /// its summary.
    ///
    /// Only the scheduler calls this; the manual start command goes through
    /// [`crate::Scheduler::start_now`].
    #[instrument(skip(self))]
    pub(crate) async fn start_week(
        &self,
        at: DateTime<Utc>,
    ) -> Result<(WeekRecord, MessageHandle), ChallengeError> {
        let ctx = self.context(at);
        let _guard = self.locks.lock(ctx.week_id).await;
        let record = self.initialize(&ctx).await?;
        self.locks.prune(ctx.week_id);
        let handle = self.publish(&ctx, &record, Publish::Repost).await?;
        Ok((record, handle))
    }

    /// Daily post for the week of `at`, initializing the week if it was never
    /// started.
    #[instrument(skip(self))]
    pub(crate) async fn continue_week(
        &self,
        at: DateTime<Utc>,
    ) -> Result<(WeekRecord, MessageHandle), ChallengeError> {
        let ctx = self.context(at);
        let _guard = self.locks.lock(ctx.week_id).await;
        let record = match self.book.load_week(ctx.week_id)? {
            Some(record) => record,
            None => {
                info!(week_id = %ctx.week_id, "no record for this week, initializing");
                self.initialize(&ctx).await?
            }
        };
        let mode = if self.config.repost_daily {
            Publish::Repost
        } else {
            Publish::Sync
        };
        let handle = self.publish(&ctx, &record, mode).await?;
        Ok((record, handle))
    }

    /// Post the current summary as a new message. `None` when the week has
    /// no record.
    #[instrument(skip(self))]
    pub async fn post_summary(&self, at: DateTime<Utc>) -> Result<Option<MessageHandle>, ChallengeError> {
        let ctx = self.context(at);
        let _guard = self.locks.lock(ctx.week_id).await;
        let Some(record) = self.book.load_week(ctx.week_id)? else {
            return Ok(None);
        };
        self.publish(&ctx, &record, Publish::Repost).await.map(Some)
    }

    /// Delete the record and summary handle of the week of `at`.
    #[instrument(skip(self))]
    pub async fn delete_current(&self, at: DateTime<Utc>) -> Result<DeleteOutcome, ChallengeError> {
        let ctx = self.context(at);
        let _guard = self.locks.lock(ctx.week_id).await;
        self.book.delete_week(ctx.week_id)
    }

    async fn initialize(&self, ctx: &WeekContext) -> Result<WeekRecord, ChallengeError> {
        let names = self.snapshot().await?;
        self.book
            .initialize_week(ctx.week_id, names, self.config.week_length)
    }

    /// Display names of channel members, minus the bot and excluded users.
    async fn snapshot(&self) -> Result<Vec<String>, ChallengeError> {
        let bot = self.platform.identity().await?;
        let members = self
            .platform
            .list_channel_members(&self.config.channel)
            .await?;

        let mut names = Vec::with_capacity(members.len());
        for member in members
            .iter()
            .filter(|m| **m != bot && !self.config.excluded_users.contains(*m))
        {
            names.push(self.platform.display_name(member).await?);
        }
        Ok(names)
    }

    async fn publish(
        &self,
        ctx: &WeekContext,
        record: &WeekRecord,
        mode: Publish,
    ) -> Result<MessageHandle, ChallengeError> {
        let text = render(ctx, record, self.config.locale);
        match mode {
            Publish::Sync => self.sync.sync_summary(ctx.week_id, &text).await,
            Publish::Repost => self.sync.repost_summary(ctx.week_id, &text).await,
        }
    }
}
