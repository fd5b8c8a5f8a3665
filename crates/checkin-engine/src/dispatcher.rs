//! Turns inbound chat events into challenge operations and channel replies.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use checkin_core::{ChatEvent, ChatPlatform, Clock, MarkOutcome, MessageHandle, Notice};

use crate::book::DeleteOutcome;
use crate::challenge::Challenge;
use crate::errors::ChallengeError;
use crate::scheduler::Scheduler;
use crate::trigger::{Command, Trigger, TriggerParser};

/// Event entry point. Cheap to share; each event is handled independently.
pub struct Dispatcher {
    challenge: Arc<Challenge>,
    scheduler: Arc<Scheduler>,
    platform: Arc<dyn ChatPlatform>,
    clock: Arc<dyn Clock>,
    parser: TriggerParser,
}

impl Dispatcher {
    /// Dispatcher routing the start command through `scheduler`.
    pub fn new(
        challenge: Arc<Challenge>,
        scheduler: Arc<Scheduler>,
        platform: Arc<dyn ChatPlatform>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = challenge.config();
        let parser = TriggerParser::new(config.link_pattern.clone(), config.commands.clone());
        Self {
            challenge,
            scheduler,
            platform,
            clock,
            parser,
        }
    }

    /// Handle one event. Failures are logged and answered in the channel;
    /// nothing is returned to the caller.
    #[instrument(skip_all, fields(channel = %event.channel, user = %event.author, ts = %event.ts))]
    pub async fn dispatch(&self, event: &ChatEvent) {
        if event.channel != self.challenge.config().channel {
            debug!("event outside the challenge channel");
            return;
        }
        match self.parser.parse(event) {
            Trigger::Completion { link } => self.on_completion(event, link.as_deref()).await,
            Trigger::Command(command) => self.on_command(event, command).await,
            Trigger::Ignore => {}
        }
    }

    async fn on_completion(&self, event: &ChatEvent, link: Option<&str>) {
        let at = self.event_time(event);
        match self.challenge.complete(&event.author, link, at).await {
            Ok(MarkOutcome::Marked(slot)) => {
                debug!(slot = slot.index(), "completion accepted");
                let message = MessageHandle::new(event.channel.clone(), event.ts.clone());
                let reaction = &self.challenge.config().completion_reaction;
                if let Err(e) = self.platform.add_reaction(&message, reaction).await {
                    warn!(error = %e, "could not add completion reaction");
                }
            }
            Ok(MarkOutcome::AlreadyCompleted) => self.reply(event, &Notice::AlreadyCompleted).await,
            Err(e) if e.is_rejection() => {
                info!(reason = e.error_kind(), "completion rejected");
                self.reply(event, &self.rejection_notice(&e)).await;
            }
            Err(e) => {
                error!(error = %e, kind = e.error_kind(), "completion failed");
                self.reply(event, &Notice::CompletionFailed).await;
            }
        }
    }

    async fn on_command(&self, event: &ChatEvent, command: Command) {
        info!(?command, "channel command");
        let now = self.clock.now();
        match command {
            Command::Start => {
                if let Err(e) = self.scheduler.start_now().await {
                    error!(error = %e, kind = e.error_kind(), "week start failed");
                    self.reply(event, &Notice::PostFailed).await;
                }
            }
            Command::Post => match self.challenge.post_summary(now).await {
                Ok(Some(_)) => {}
                Ok(None) => self.reply(event, &Notice::NoRecord).await,
                Err(e) => {
                    error!(error = %e, kind = e.error_kind(), "summary post failed");
                    self.reply(event, &Notice::PostFailed).await;
                }
            },
            Command::Delete => match self.challenge.delete_current(now).await {
                Ok(DeleteOutcome::Deleted) => self.reply(event, &Notice::Deleted).await,
                Ok(DeleteOutcome::Absent) => self.reply(event, &Notice::NothingToDelete).await,
                Err(e) => {
                    error!(error = %e, kind = e.error_kind(), "week delete failed");
                    self.reply(event, &Notice::DeleteFailed).await;
                }
            },
        }
    }

    fn rejection_notice(&self, err: &ChallengeError) -> Notice {
        match err {
            ChallengeError::SubmissionClosed => Notice::SubmissionClosed,
            ChallengeError::MissingQualifyingContent => Notice::MissingLink,
            ChallengeError::ChallengeNotStarted => Notice::NotStarted {
                start_command: self.challenge.config().commands.start.clone(),
            },
            ChallengeError::UnknownParticipant(_) => Notice::UnknownParticipant,
            ChallengeError::NoSlotToday => Notice::NoSlotToday,
            ChallengeError::Store(_) | ChallengeError::Platform(_) | ChallengeError::Clock(_) => {
                Notice::CompletionFailed
            }
        }
    }

    /// When the message was posted, falling back to now for a malformed ts.
    fn event_time(&self, event: &ChatEvent) -> DateTime<Utc> {
        event.posted_at().unwrap_or_else(|e| {
            warn!(error = %e, "using current time for event");
            self.clock.now()
        })
    }

    async fn reply(&self, event: &ChatEvent, notice: &Notice) {
        let text = notice.text(self.challenge.config().locale);
        if let Err(e) = self
            .platform
            .post_reply(&event.channel, event.reply_thread(), &text)
            .await
        {
            warn!(error = %e, "reply failed");
        }
    }
}
