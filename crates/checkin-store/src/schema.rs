//! SQL DDL for the checkin database.

/// Bumped whenever `CREATE_TABLES` changes shape.
pub const SCHEMA_VERSION: u32 = 1;

/// Tables are keyed by week id (`2024-W37`).
pub const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS attendance_records (
    week_id TEXT PRIMARY KEY,
    week_length INTEGER NOT NULL,
    participants TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS summary_messages (
    week_id TEXT PRIMARY KEY,
    channel_id TEXT NOT NULL,
    message_ts TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
";

/// Applied on every connection.
pub const PRAGMAS: &str = r"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
";
