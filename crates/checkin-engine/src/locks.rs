//! Per-week mutual exclusion.
//!
//! Events are handled on concurrent tasks. Every load → mutate → persist →
//! sync sequence for a week runs under that week's lock, so two completions
//! for the same week never interleave and at most one summary handle is live.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use checkin_core::WeekId;

/// Lazily created async mutex per [`WeekId`].
#[derive(Default)]
pub struct WeekLocks {
    locks: DashMap<WeekId, Arc<Mutex<()>>>,
}

impl WeekLocks {
    /// Empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `week`.
    pub async fn lock(&self, week: WeekId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard guard is released before awaiting.
        let lock = self.locks.entry(week).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop locks for every week other than `keep` that nobody holds.
    pub fn prune(&self, keep: WeekId) {
        self.locks
            .retain(|week, lock| *week == keep || Arc::strong_count(lock) > 1);
    }

    /// Number of weeks with a lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether no lock entries exist.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
