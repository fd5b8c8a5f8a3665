use chrono::Utc;
use tracing::instrument;

use checkin_core::{ParticipantRow, WeekId, WeekLength, WeekRecord};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const TABLE: &str = "attendance_records";

/// `attendance_records`: one attendance matrix per week.
pub struct RecordRepo {
    db: Database,
}

impl RecordRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Stored record for `week`, if any.
    #[instrument(skip(self), fields(week_id = %week))]
    pub fn get(&self, week: WeekId) -> Result<Option<WeekRecord>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT week_length, participants FROM attendance_records WHERE week_id = ?1",
            )?;
            let mut rows = stmt.query([week.to_string()])?;
            let Some(row) = rows.next()? else {
                return Ok(None);
            };
            let length: i64 = row_helpers::get(row, 0, TABLE, "week_length")?;
            let participants: String = row_helpers::get(row, 1, TABLE, "participants")?;
            decode(length, &participants).map(Some)
        })
    }

    /// Insert or replace the record for `week`.
    #[instrument(skip(self, record), fields(week_id = %week))]
    pub fn upsert(&self, week: WeekId, record: &WeekRecord) -> Result<(), StoreError> {
        let participants = serde_json::to_string(record.participants())?;
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO attendance_records (week_id, week_length, participants, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(week_id) DO UPDATE SET
                     week_length = excluded.week_length,
                     participants = excluded.participants,
                     updated_at = excluded.updated_at",
                rusqlite::params![week.to_string(), record.length().as_i64(), participants, now],
            )?;
            Ok(())
        })
    }

    /// Remove the record. Returns whether one existed.
    #[instrument(skip(self), fields(week_id = %week))]
    pub fn delete(&self, week: WeekId) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM attendance_records WHERE week_id = ?1",
                [week.to_string()],
            )?;
            Ok(n > 0)
        })
    }
}

fn decode(length: i64, participants: &str) -> Result<WeekRecord, StoreError> {
    let length = WeekLength::from_i64(length).ok_or_else(|| StoreError::CorruptRow {
        table: TABLE,
        column: "week_length",
        detail: format!("unsupported week length {length}"),
    })?;
    let rows: Vec<ParticipantRow> = row_helpers::parse_json(participants, TABLE, "participants")?;
    WeekRecord::from_parts(length, rows).ok_or_else(|| StoreError::CorruptRow {
        table: TABLE,
        column: "participants",
        detail: "row length mismatch or duplicate participant".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_core::{DaySlot, SlotPolicy};

    fn week() -> WeekId {
        "2024-W37".parse().unwrap()
    }

    fn repo() -> RecordRepo {
        RecordRepo::new(Database::in_memory().unwrap())
    }

    #[test]
    fn get_absent_is_none() {
        assert!(repo().get(week()).unwrap().is_none());
    }

    #[test]
    fn upsert_then_get_preserves_order_and_cells() {
        let repo = repo();
        let mut record = WeekRecord::new(WeekLength::Business, ["Lee", "Kim"]);
        let _ = record
            .mark("Kim", DaySlot::for_weekday(2, WeekLength::Business).unwrap(), SlotPolicy::Today)
            .unwrap();
        repo.upsert(week(), &record).unwrap();

        let loaded = repo.get(week()).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.names().collect::<Vec<_>>(), ["Lee", "Kim"]);
    }

    #[test]
    fn upsert_overwrites() {
        let repo = repo();
        repo.upsert(week(), &WeekRecord::new(WeekLength::Business, ["Kim"])).unwrap();
        let replacement = WeekRecord::new(WeekLength::Full, ["Park"]);
        repo.upsert(week(), &replacement).unwrap();
        assert_eq!(repo.get(week()).unwrap().unwrap(), replacement);
    }

    #[test]
    fn delete_reports_presence() {
        let repo = repo();
        assert!(!repo.delete(week()).unwrap());
        repo.upsert(week(), &WeekRecord::new(WeekLength::Business, ["Kim"])).unwrap();
        assert!(repo.delete(week()).unwrap());
        assert!(repo.get(week()).unwrap().is_none());
    }

    #[test]
    fn corrupt_participants_surface_as_corrupt_row() {
        let db = Database::in_memory().unwrap();
        db.with_conn(|conn| {
            let _ = conn.execute(
                "INSERT INTO attendance_records VALUES ('2024-W37', 5, '[{\"name\":\"Kim\",\"days\":[\"pending\"]}]', 'x', 'x')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        let err = RecordRepo::new(db).get(week()).unwrap_err();
        assert!(matches!(err, StoreError::CorruptRow { column: "participants", .. }));
    }

    #[test]
    fn unknown_week_length_is_corrupt_row() {
        let err = decode(6, "[]").unwrap_err();
        assert!(matches!(err, StoreError::CorruptRow { column: "week_length", .. }));
    }
}
