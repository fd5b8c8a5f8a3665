//! Operator log: warn+ events persisted to a `logs` table.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::{Level, span};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// A log record persisted to SQLite.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct LogRecord {
    pub id: i64,
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    /// Remaining event fields as a JSON object.
    pub fields: Option<String>,
    pub week_id: Option<String>,
    pub participant: Option<String>,
}

/// Filters for searching persisted logs. All set filters must match.
#[derive(Clone, Debug, Default)]
pub struct LogQuery {
    /// Exact level, e.g. `ERROR`.
    pub level: Option<String>,
    /// Substring of the target module path.
    pub target: Option<String>,
    /// Exact week id, e.g. `2024-W37`.
    pub week_id: Option<String>,
    /// RFC 3339 lower bound on the timestamp.
    pub since: Option<String>,
    /// Maximum rows, newest first. Defaults to 100.
    pub limit: Option<u32>,
}

/// SQLite sink for the operator log.
pub struct SqliteLogSink {
    conn: Mutex<Connection>,
}

impl SqliteLogSink {
    /// Open (or create) the log table in the database at `db_path`.
    pub fn new(db_path: &Path) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;
             CREATE TABLE IF NOT EXISTS logs (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 timestamp TEXT NOT NULL,
                 level TEXT NOT NULL,
                 target TEXT NOT NULL,
                 message TEXT NOT NULL,
                 fields TEXT,
                 week_id TEXT,
                 participant TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_logs_level ON logs(level);
             CREATE INDEX IF NOT EXISTS idx_logs_week ON logs(week_id);
             CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs(timestamp);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn insert(&self, record: &LogInsert) {
        let conn = self.conn.lock();
        let _ = conn.execute(
            "INSERT INTO logs (timestamp, level, target, message, fields, week_id, participant)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                record.timestamp,
                record.level,
                record.target,
                record.message,
                record.fields,
                record.week_id,
                record.participant,
            ],
        );
    }

    /// Newest-first records matching `q`.
    pub fn query(&self, q: &LogQuery) -> Result<Vec<LogRecord>, rusqlite::Error> {
        let conn = self.conn.lock();
        let mut sql = String::from(
            "SELECT id, timestamp, level, target, message, fields, week_id, participant FROM logs WHERE 1=1",
        );
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(level) = &q.level {
            params.push(Box::new(level.to_uppercase()));
            let _ = write!(sql, " AND level = ?{}", params.len());
        }
        if let Some(target) = &q.target {
            params.push(Box::new(format!("%{target}%")));
            let _ = write!(sql, " AND target LIKE ?{}", params.len());
        }
        if let Some(week_id) = &q.week_id {
            params.push(Box::new(week_id.clone()));
            let _ = write!(sql, " AND week_id = ?{}", params.len());
        }
        if let Some(since) = &q.since {
            params.push(Box::new(since.clone()));
            let _ = write!(sql, " AND timestamp >= ?{}", params.len());
        }

        let limit = q.limit.unwrap_or(100);
        let _ = write!(sql, " ORDER BY id DESC LIMIT {limit}");

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(AsRef::as_ref).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), |row| {
            Ok(LogRecord {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                level: row.get(2)?,
                target: row.get(3)?,
                message: row.get(4)?,
                fields: row.get(5)?,
                week_id: row.get(6)?,
                participant: row.get(7)?,
            })
        })?;

        rows.collect()
    }

    /// Total persisted records.
    pub fn count(&self) -> Result<i64, rusqlite::Error> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))
    }
}

struct LogInsert {
    timestamp: String,
    level: String,
    target: String,
    message: String,
    fields: Option<String>,
    week_id: Option<String>,
    participant: Option<String>,
}

/// tracing Layer that writes events at or above a level to a [`SqliteLogSink`].
pub struct SqliteLogLayer {
    sink: Arc<SqliteLogSink>,
    min_level: Level,
}

impl SqliteLogLayer {
    /// Persist events at `min_level` or more severe.
    pub fn new(sink: Arc<SqliteLogSink>, min_level: Level) -> Self {
        Self { sink, min_level }
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: serde_json::Map<String, serde_json::Value>,
    week_id: Option<String>,
    participant: Option<String>,
}

impl FieldVisitor {
    fn put(&mut self, name: &str, value: String) {
        match name {
            "message" => self.message = Some(value),
            "week_id" => self.week_id = Some(value),
            "participant" => self.participant = Some(value),
            name => {
                let _ = self
                    .fields
                    .insert(name.to_string(), serde_json::Value::String(value));
            }
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let val = format!("{value:?}");
        let val = if field.name() == "message" {
            val
        } else {
            val.trim_matches('"').to_string()
        };
        self.put(field.name(), val);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field.name(), value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        let _ = self
            .fields
            .insert(field.name().to_string(), serde_json::Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        let _ = self
            .fields
            .insert(field.name().to_string(), serde_json::Value::Number(value.into()));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        let _ = self
            .fields
            .insert(field.name().to_string(), serde_json::Value::Bool(value));
    }
}

/// Stored on spans so child events inherit `week_id` / `participant`.
struct SpanFields {
    week_id: Option<String>,
    participant: Option<String>,
}

impl<S> Layer<S> for SqliteLogLayer
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > self.min_level {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        if visitor.week_id.is_none() || visitor.participant.is_none() {
            if let Some(scope) = ctx.event_scope(event) {
                for span in scope {
                    let extensions = span.extensions();
                    if let Some(fields) = extensions.get::<SpanFields>() {
                        if visitor.week_id.is_none() {
                            visitor.week_id.clone_from(&fields.week_id);
                        }
                        if visitor.participant.is_none() {
                            visitor.participant.clone_from(&fields.participant);
                        }
                    }
                }
            }
        }

        let fields_json = if visitor.fields.is_empty() {
            None
        } else {
            serde_json::to_string(&visitor.fields).ok()
        };

        self.sink.insert(&LogInsert {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string().to_uppercase(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: fields_json,
            week_id: visitor.week_id,
            participant: visitor.participant,
        });
    }

    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);

        if visitor.week_id.is_some() || visitor.participant.is_some() {
            if let Some(span) = ctx.span(id) {
                span.extensions_mut().insert(SpanFields {
                    week_id: visitor.week_id,
                    participant: visitor.participant,
                });
            }
        }
    }
}
