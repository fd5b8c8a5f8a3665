//! Daily trigger: starts a week on Monday and posts the summary on the other
//! days of the week length.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use checkin_core::clock::next_fire_after;
use checkin_core::{Clock, MessageHandle, WeekLength};

use crate::challenge::Challenge;
use crate::errors::ChallengeError;

/// What the daily run does on a given weekday.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduledAction {
    /// Snapshot members and start a new week.
    StartWeek,
    /// Post the running week, initializing it if absent.
    Continue,
    /// Outside the week length.
    Idle,
}

/// Pure decision for `weekday_index` (Monday = 0).
pub fn decide(weekday_index: u32, length: WeekLength) -> ScheduledAction {
    if weekday_index == 0 {
        ScheduledAction::StartWeek
    } else if (weekday_index as usize) < length.slots() {
        ScheduledAction::Continue
    } else {
        ScheduledAction::Idle
    }
}

/// Timer loop around [`decide`]. The only caller of week initialization.
pub struct Scheduler {
    challenge: Arc<Challenge>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    /// Scheduler for `challenge`, reading time from `clock`.
    pub fn new(challenge: Arc<Challenge>, clock: Arc<dyn Clock>) -> Self {
        Self { challenge, clock }
    }

    /// Run the scheduled action for `at`. `None` when the day is idle.
    #[instrument(skip(self))]
    pub async fn fire(&self, at: DateTime<Utc>) -> Result<Option<MessageHandle>, ChallengeError> {
        let ctx = self.challenge.context(at);
        let action = decide(ctx.weekday_index, self.challenge.config().week_length);
        debug!(week_id = %ctx.week_id, ?action, "scheduled run");
        match action {
            ScheduledAction::StartWeek => {
                let (_, handle) = self.challenge.start_week(at).await?;
                Ok(Some(handle))
            }
            ScheduledAction::Continue => {
                let (_, handle) = self.challenge.continue_week(at).await?;
                Ok(Some(handle))
            }
            ScheduledAction::Idle => Ok(None),
        }
    }

    /// Start the current week now, whatever the weekday.
    pub async fn start_now(&self) -> Result<MessageHandle, ChallengeError> {
        let now = self.clock.now();
        info!("manual week start");
        let (_, handle) = self.challenge.start_week(now).await?;
        Ok(handle)
    }

    /// Fire once a day at the configured local time until `cancel`.
    ///
    /// Each run is keyed to its target instant, so the next target is always
    /// the following day even if the clock reads slightly early on wake-up.
    pub async fn run(&self, cancel: CancellationToken) {
        let config = self.challenge.config();
        let mut after = self.clock.now();
        loop {
            let target = next_fire_after(after, config.fire_time, config.zone);
            let wait = (target - self.clock.now()).to_std().unwrap_or(Duration::ZERO);
            debug!(%target, wait_secs = wait.as_secs(), "next scheduled run");

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(wait) => {}
            }

            if let Err(e) = self.fire(target).await {
                error!(error = %e, kind = e.error_kind(), "scheduled run failed");
            }
            after = target;
        }
        info!("scheduler stopped");
    }
}
