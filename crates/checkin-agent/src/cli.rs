//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use checkin_logging::LogQuery;

/// Weekly attendance challenge bot for Slack.
#[derive(Parser, Debug)]
#[command(name = "checkin", about = "Weekly attendance challenge bot", version)]
pub struct Cli {
    /// Settings file (default `~/.checkin/settings.json`).
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// SQLite database for records and the operator log (overrides settings).
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The subcommand, `run` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

/// What to do.
#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Listen for events and run the daily schedule until Ctrl-C.
    Run,
    /// Start the current week now and post its summary.
    Start,
    /// Post the current week's summary as a new message.
    Post,
    /// Delete the current week's record.
    Delete,
    /// Show persisted warnings and errors, newest first.
    Logs {
        /// Only this level (e.g. `error`).
        #[arg(long)]
        level: Option<String>,
        /// Only this week (e.g. `2024-W37`).
        #[arg(long)]
        week: Option<String>,
        /// Target substring (e.g. `checkin_slack`).
        #[arg(long)]
        target: Option<String>,
        /// RFC 3339 lower bound.
        #[arg(long)]
        since: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

impl Command {
    /// Whether this command talks to Slack over a socket.
    pub fn needs_socket(&self) -> bool {
        matches!(self, Self::Run)
    }

    /// Log query for [`Command::Logs`].
    pub fn log_query(&self) -> Option<LogQuery> {
        match self {
            Self::Logs {
                level,
                week,
                target,
                since,
                limit,
            } => Some(LogQuery {
                level: level.clone(),
                target: target.clone(),
                week_id: week.clone(),
                since: since.clone(),
                limit: Some(*limit),
            }),
            _ => None,
        }
    }
}
