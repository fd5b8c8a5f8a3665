//! # checkin-logging
//!
//! Process-wide `tracing` setup: a console layer (compact or JSON, on stderr)
//! filtered by `RUST_LOG` or the configured level, and an optional
//! [`SqliteLogLayer`] that keeps warn+ events in the operator log.

#![deny(unsafe_code)]

mod sink;

pub use sink::{LogQuery, LogRecord, SqliteLogLayer, SqliteLogSink};

use std::path::PathBuf;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Console filter directive when `RUST_LOG` is unset, e.g. `info`.
    pub level: String,
    /// JSON lines instead of compact text.
    pub json: bool,
    /// Database holding the operator log. `None` disables persistence.
    pub persist_db: Option<PathBuf>,
    /// Least severe level persisted.
    pub persist_level: Level,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            persist_db: None,
            persist_level: Level::WARN,
        }
    }
}

/// Keeps the operator log sink reachable after init.
pub struct LoggingGuard {
    sink: Option<Arc<SqliteLogSink>>,
}

impl LoggingGuard {
    /// Sink for querying persisted logs, when persistence is on.
    pub fn logs(&self) -> Option<&SqliteLogSink> {
        self.sink.as_deref()
    }
}

/// Install the global subscriber. Safe to call more than once: later calls
/// leave the first subscriber in place.
pub fn init_logging(config: &LoggingConfig) -> LoggingGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed()
    };

    let (sqlite_layer, sink) = match &config.persist_db {
        Some(path) => match SqliteLogSink::new(path) {
            Ok(sink) => {
                let sink = Arc::new(sink);
                let layer = SqliteLogLayer::new(Arc::clone(&sink), config.persist_level);
                (Some(layer), Some(sink))
            }
            Err(e) => {
                eprintln!("checkin-logging: failed to open log DB {}: {e}", path.display());
                (None, None)
            }
        },
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(sqlite_layer)
        .try_init();

    LoggingGuard { sink }
}

/// Map a level name to a [`Level`], defaulting to WARN.
pub fn parse_level(s: &str) -> Level {
    s.parse().unwrap_or(Level::WARN)
}
