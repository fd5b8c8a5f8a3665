use chrono::Utc;
use tracing::instrument;

use checkin_core::{ChannelId, MessageHandle, MessageTs, WeekId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const TABLE: &str = "summary_messages";

/// `summary_messages`: the live summary message per week.
pub struct HandleRepo {
    db: Database,
}

impl HandleRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(week_id = %week))]
    pub fn get(&self, week: WeekId) -> Result<Option<MessageHandle>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT channel_id, message_ts FROM summary_messages WHERE week_id = ?1")?;
            let mut rows = stmt.query([week.to_string()])?;
            let Some(row) = rows.next()? else {
                return Ok(None);
            };
            let channel: String = row_helpers::get(row, 0, TABLE, "channel_id")?;
            let ts: String = row_helpers::get(row, 1, TABLE, "message_ts")?;
            Ok(Some(MessageHandle::new(
                ChannelId::from_raw(channel),
                MessageTs::from_raw(ts),
            )))
        })
    }

    /// Replace the handle for `week`.
    #[instrument(skip(self), fields(week_id = %week, handle = %handle))]
    pub fn put(&self, week: WeekId, handle: &MessageHandle) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO summary_messages (week_id, channel_id, message_ts, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(week_id) DO UPDATE SET
                     channel_id = excluded.channel_id,
                     message_ts = excluded.message_ts,
                     updated_at = excluded.updated_at",
                rusqlite::params![
                    week.to_string(),
                    handle.channel.as_str(),
                    handle.ts.as_str(),
                    now
                ],
            )?;
            Ok(())
        })
    }

    /// Returns whether a handle existed.
    #[instrument(skip(self), fields(week_id = %week))]
    pub fn delete(&self, week: WeekId) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM summary_messages WHERE week_id = ?1",
                [week.to_string()],
            )?;
            Ok(n > 0)
        })
    }
}
