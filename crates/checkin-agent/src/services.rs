//! Wiring of store, Slack client and engine.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use checkin_core::{Clock, SystemClock};
use checkin_engine::{Challenge, Dispatcher, EngineConfig, Scheduler};
use checkin_settings::{CheckinSettings, ParsedSettings};
use checkin_slack::{SlackClient, SlackConfig};
use checkin_store::{Database, SqliteWeekStore};

/// Everything a command needs, built once.
pub struct Services {
    pub client: Arc<SlackClient>,
    pub challenge: Arc<Challenge>,
    pub scheduler: Arc<Scheduler>,
    pub dispatcher: Arc<Dispatcher>,
    pub clock: Arc<dyn Clock>,
}

impl Services {
    pub fn build(settings: &CheckinSettings, parsed: &ParsedSettings, db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;
        let store = Arc::new(SqliteWeekStore::new(db));

        let client = Arc::new(
            SlackClient::new(SlackConfig {
                bot_token: settings.slack.bot_token.clone(),
                app_token: settings.slack.app_token.clone(),
                base_url: settings.slack.api_base_url.clone(),
                request_timeout: Duration::from_millis(settings.slack.request_timeout_ms),
            })
            .context("Failed to build Slack client")?,
        );

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let config = EngineConfig::from_settings(settings, parsed);
        let challenge = Arc::new(Challenge::new(config, client.clone(), store));
        let scheduler = Arc::new(Scheduler::new(challenge.clone(), clock.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            challenge.clone(),
            scheduler.clone(),
            client.clone(),
            clock.clone(),
        ));

        Ok(Self {
            client,
            challenge,
            scheduler,
            dispatcher,
            clock,
        })
    }
}
