//! The [`WeekStore`] seam and its SQLite implementation.

use checkin_core::{MessageHandle, WeekId, WeekRecord};
use tracing::instrument;

use crate::database::Database;
use crate::error::StoreError;
use crate::handles::HandleRepo;
use crate::records::RecordRepo;

/// Durable per-week state: the attendance matrix and the live summary handle.
///
/// Calls are short and synchronous; async callers invoke them inline.
pub trait WeekStore: Send + Sync {
    /// Stored record, if any.
    fn get_record(&self, week: WeekId) -> Result<Option<WeekRecord>, StoreError>;
    /// Insert or replace the record.
    fn put_record(&self, week: WeekId, record: &WeekRecord) -> Result<(), StoreError>;
    /// Remove the record. Returns whether one existed.
    fn delete_record(&self, week: WeekId) -> Result<bool, StoreError>;

    /// Stored summary handle, if any.
    fn get_handle(&self, week: WeekId) -> Result<Option<MessageHandle>, StoreError>;
    /// Insert or replace the summary handle.
    fn put_handle(&self, week: WeekId, handle: &MessageHandle) -> Result<(), StoreError>;
    /// Remove the summary handle. Returns whether one existed.
    fn delete_handle(&self, week: WeekId) -> Result<bool, StoreError>;

    /// Remove record and handle together. Returns whether a record existed.
    fn delete_week(&self, week: WeekId) -> Result<bool, StoreError> {
        let existed = self.delete_record(week)?;
        let _ = self.delete_handle(week)?;
        Ok(existed)
    }
}

/// [`WeekStore`] over the SQLite [`Database`].
#[derive(Clone)]
pub struct SqliteWeekStore {
    db: Database,
}

impl SqliteWeekStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn records(&self) -> RecordRepo {
        RecordRepo::new(self.db.clone())
    }

    fn handles(&self) -> HandleRepo {
        HandleRepo::new(self.db.clone())
    }
}

impl WeekStore for SqliteWeekStore {
    fn get_record(&self, week: WeekId) -> Result<Option<WeekRecord>, StoreError> {
        self.records().get(week)
    }

    fn put_record(&self, week: WeekId, record: &WeekRecord) -> Result<(), StoreError> {
        self.records().upsert(week, record)
    }

    fn delete_record(&self, week: WeekId) -> Result<bool, StoreError> {
        self.records().delete(week)
    }

    fn get_handle(&self, week: WeekId) -> Result<Option<MessageHandle>, StoreError> {
        self.handles().get(week)
    }

    fn put_handle(&self, week: WeekId, handle: &MessageHandle) -> Result<(), StoreError> {
        self.handles().put(week, handle)
    }

    fn delete_handle(&self, week: WeekId) -> Result<bool, StoreError> {
        self.handles().delete(week)
    }

    /// Both rows go in one transaction.
    #[instrument(skip(self), fields(week_id = %week))]
    fn delete_week(&self, week: WeekId) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            let key = week.to_string();
            let n = tx.execute("DELETE FROM attendance_records WHERE week_id = ?1", [&key])?;
            let _ = tx.execute("DELETE FROM summary_messages WHERE week_id = ?1", [&key])?;
            tx.commit()?;
            Ok(n > 0)
        })
    }
}
