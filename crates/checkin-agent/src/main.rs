//! # checkin
//!
//! Binary entry point: loads settings, sets up logging, then either runs the
//! bot (Socket Mode listener plus daily scheduler) or performs a one-shot
//! operation on the current week.

#![deny(unsafe_code)]

mod cli;
mod services;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use checkin_core::ChatEvent;
use checkin_engine::DeleteOutcome;
use checkin_logging::{LogQuery, LoggingConfig, SqliteLogSink, init_logging, parse_level};
use checkin_settings::{CheckinSettings, load_settings_from_path, settings_path};
use checkin_slack::SocketModeListener;

use crate::cli::{Cli, Command};
use crate::services::Services;

const EVENT_QUEUE: usize = 64;

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command();

    let path = cli.settings.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if let Some(db_path) = &cli.db_path {
        settings.storage.db_path = Some(db_path.to_string_lossy().into_owned());
    }
    let parsed = settings.validate().context("Invalid settings")?;

    let db_path = settings.db_path();
    ensure_parent_dir(&db_path)?;

    let _logging = init_logging(&LoggingConfig {
        level: settings.logging.level.as_filter_str().to_string(),
        json: settings.logging.json,
        persist_db: settings.logging.persist.then(|| db_path.clone()),
        persist_level: parse_level(settings.logging.persist_level.as_filter_str()),
    });

    if let Some(query) = command.log_query() {
        return print_logs(&db_path, &query);
    }

    settings
        .require_slack(command.needs_socket())
        .context("Slack is not configured")?;
    let services = Services::build(&settings, &parsed, &db_path)?;

    match command {
        Command::Run => run(&settings, services).await,
        Command::Start => {
            let handle = services.scheduler.start_now().await?;
            println!("week started, summary posted as {handle}");
            Ok(())
        }
        Command::Post => {
            match services.challenge.post_summary(services.clock.now()).await? {
                Some(handle) => println!("summary posted as {handle}"),
                None => println!("no record for the current week"),
            }
            Ok(())
        }
        Command::Delete => {
            match services.challenge.delete_current(services.clock.now()).await? {
                DeleteOutcome::Deleted => println!("current week deleted"),
                DeleteOutcome::Absent => println!("nothing to delete"),
            }
            Ok(())
        }
        Command::Logs { .. } => Ok(()),
    }
}

/// Listen and schedule until Ctrl-C, then drain in-flight events.
async fn run(settings: &CheckinSettings, services: Services) -> Result<()> {
    let cancel = CancellationToken::new();
    let (events_tx, mut events_rx) = mpsc::channel::<ChatEvent>(EVENT_QUEUE);
    let mut background = JoinSet::new();

    let listener = SocketModeListener::new(
        services.client.clone(),
        Duration::from_millis(settings.slack.max_reconnect_backoff_ms),
    );
    {
        let cancel = cancel.clone();
        let _ = background.spawn(async move { listener.run(events_tx, cancel).await });
    }

    if settings.schedule.enabled {
        let scheduler = services.scheduler.clone();
        let cancel = cancel.clone();
        let _ = background.spawn(async move { scheduler.run(cancel).await });
    } else {
        info!("daily schedule disabled");
    }

    info!(
        channel = %services.challenge.config().channel,
        zone = %services.challenge.config().zone,
        "checkin is running"
    );

    let handlers = TaskTracker::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            res = &mut shutdown => {
                if let Err(e) = res {
                    warn!(error = %e, "could not listen for Ctrl-C");
                }
                break;
            }
            event = events_rx.recv() => {
                let Some(event) = event else { break };
                let dispatcher = services.dispatcher.clone();
                let _ = handlers.spawn(async move { dispatcher.dispatch(&event).await });
            }
        }
    }

    info!("shutting down");
    cancel.cancel();
    handlers.close();
    handlers.wait().await;
    while let Some(res) = background.join_next().await {
        if let Err(e) = res {
            warn!(error = %e, "background task ended abnormally");
        }
    }
    Ok(())
}

fn print_logs(db_path: &Path, query: &LogQuery) -> Result<()> {
    let sink = SqliteLogSink::new(db_path)
        .with_context(|| format!("Failed to open log database {}", db_path.display()))?;
    let records = sink.query(query).context("Failed to query logs")?;
    if records.is_empty() {
        println!("no log entries");
    }
    for r in records {
        let week = r.week_id.as_deref().unwrap_or("-");
        println!("{} {:<5} [{week}] {}: {}", r.timestamp, r.level, r.target, r.message);
        if let Some(fields) = r.fields {
            println!("    {fields}");
        }
    }
    Ok(())
}
