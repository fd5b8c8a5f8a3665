//! In-memory [`WeekStore`] for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use checkin_core::{MessageHandle, WeekId, WeekRecord};

use crate::error::StoreError;
use crate::week_store::WeekStore;

/// HashMap-backed store that counts writes and can be told to fail.
#[derive(Default)]
pub struct MemoryWeekStore {
    records: Mutex<HashMap<WeekId, WeekRecord>>,
    handles: Mutex<HashMap<WeekId, MessageHandle>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryWeekStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful put/delete calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent write fail with [`StoreError::Database`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn begin_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("disk I/O error".into()));
        }
        let _ = self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl WeekStore for MemoryWeekStore {
    fn get_record(&self, week: WeekId) -> Result<Option<WeekRecord>, StoreError> {
        Ok(self.records.lock().get(&week).cloned())
    }

    fn put_record(&self, week: WeekId, record: &WeekRecord) -> Result<(), StoreError> {
        self.begin_write()?;
        let _ = self.records.lock().insert(week, record.clone());
        Ok(())
    }

    fn delete_record(&self, week: WeekId) -> Result<bool, StoreError> {
        self.begin_write()?;
        Ok(self.records.lock().remove(&week).is_some())
    }

    fn get_handle(&self, week: WeekId) -> Result<Option<MessageHandle>, StoreError> {
        Ok(self.handles.lock().get(&week).cloned())
    }

    fn put_handle(&self, week: WeekId, handle: &MessageHandle) -> Result<(), StoreError> {
        self.begin_write()?;
        let _ = self.handles.lock().insert(week, handle.clone());
        Ok(())
    }

    fn delete_handle(&self, week: WeekId) -> Result<bool, StoreError> {
        self.begin_write()?;
        Ok(self.handles.lock().remove(&week).is_some())
    }
}
