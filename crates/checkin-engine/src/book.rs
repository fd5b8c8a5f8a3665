//! Attendance state machine.
//!
//! [`AttendanceBook`] owns the in-memory matrix for active weeks. The store is
//! authoritative: every operation starts by reloading the week, and the cache
//! only changes after the store accepted the write.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use checkin_core::{DaySlot, MarkOutcome, SlotPolicy, WeekId, WeekLength, WeekRecord};
use checkin_store::WeekStore;

use crate::errors::ChallengeError;

/// Result of [`AttendanceBook::delete_week`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// A record existed and is gone, along with its summary handle.
    Deleted,
    /// Nothing was stored for the week.
    Absent,
}

/// A completion applied in memory but not yet persisted.
#[derive(Clone, Debug)]
pub struct StagedCompletion {
    /// What the mark did.
    pub outcome: MarkOutcome,
    /// The mutated matrix; `None` when nothing changed.
    pub record: Option<WeekRecord>,
}

/// Attendance matrices keyed by week.
pub struct AttendanceBook {
    store: Arc<dyn WeekStore>,
    cache: Mutex<HashMap<WeekId, WeekRecord>>,
}

impl AttendanceBook {
    /// Book backed by `store`, with an empty cache.
    pub fn new(store: Arc<dyn WeekStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Start `week` with a fresh matrix for `names`, replacing anything stored.
    #[instrument(skip(self, names), fields(week_id = %week))]
    pub fn initialize_week<I, S>(
        &self,
        week: WeekId,
        names: I,
        length: WeekLength,
    ) -> Result<WeekRecord, ChallengeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let record = WeekRecord::new(length, names);
        self.store.put_record(week, &record)?;
        let _ = self.cache.lock().insert(week, record.clone());
        info!(participants = record.participants().len(), "week initialized");
        Ok(record)
    }

    /// Refresh `week` from the store. `None` means the week was never started.
    pub fn load_week(&self, week: WeekId) -> Result<Option<WeekRecord>, ChallengeError> {
        let record = self.store.get_record(week)?;
        let mut cache = self.cache.lock();
        match &record {
            Some(r) => {
                let _ = cache.insert(week, r.clone());
            }
            None => {
                let _ = cache.remove(&week);
            }
        }
        Ok(record)
    }

    /// Credit `participant` for `today` under `policy`.
    ///
    /// Writes the matrix only when a cell actually changed.
    pub fn record_completion(
        &self,
        week: WeekId,
        participant: &str,
        today: DaySlot,
        policy: SlotPolicy,
    ) -> Result<MarkOutcome, ChallengeError> {
        let staged = self.stage_completion(week, participant, today, policy)?;
        let outcome = staged.outcome;
        if let Some(record) = staged.record {
            self.commit(week, record)?;
        }
        Ok(outcome)
    }

    /// Apply a completion to a fresh copy of `week` without persisting it.
    ///
    /// The store and cache are untouched until [`AttendanceBook::commit`].
    #[instrument(skip(self), fields(week_id = %week))]
    pub fn stage_completion(
        &self,
        week: WeekId,
        participant: &str,
        today: DaySlot,
        policy: SlotPolicy,
    ) -> Result<StagedCompletion, ChallengeError> {
        let Some(mut record) = self.load_week(week)? else {
            return Err(ChallengeError::ChallengeNotStarted);
        };

        let outcome = record.mark(participant, today, policy)?;
        match outcome {
            MarkOutcome::Marked(slot) => {
                debug!(slot = slot.index(), "completion staged");
                Ok(StagedCompletion {
                    outcome,
                    record: Some(record),
                })
            }
            MarkOutcome::AlreadyCompleted => {
                debug!("already completed");
                Ok(StagedCompletion {
                    outcome,
                    record: None,
                })
            }
        }
    }

    /// Persist a staged matrix for `week`, then cache it.
    #[instrument(skip(self, record), fields(week_id = %week))]
    pub fn commit(&self, week: WeekId, record: WeekRecord) -> Result<(), ChallengeError> {
        self.store.put_record(week, &record)?;
        let _ = self.cache.lock().insert(week, record);
        info!("completion recorded");
        Ok(())
    }

    /// Remove the record, its summary handle and the cached copy.
    #[instrument(skip(self), fields(week_id = %week))]
    pub fn delete_week(&self, week: WeekId) -> Result<DeleteOutcome, ChallengeError> {
        let existed = self.store.delete_week(week)?;
        let _ = self.cache.lock().remove(&week);
        if existed {
            info!("week deleted");
            Ok(DeleteOutcome::Deleted)
        } else {
            Ok(DeleteOutcome::Absent)
        }
    }

    /// Cached copy of `week` as of the last operation.
    pub fn cached(&self, week: WeekId) -> Option<WeekRecord> {
        self.cache.lock().get(&week).cloned()
    }
}
