use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, PoisonError,
    },
    time::Duration,
};

use chrono::NaiveDate;
use moka::sync::Cache;

use crate::domain::{AttendanceStatus, StudentId};

/// Size and lifetime bounds for the status cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub capacity: u64,
    pub time_to_live: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 50_000,
            time_to_live: Duration::from_secs(3600),
        }
    }
}

/// Memoized `(student, date) -> status` lookups.
///
/// Lookups that miss record the current generation before reading the ledger
/// and only publish their result if no write was committed in the meantime.
/// Writers bump the generation and invalidate under the same publish lock,
/// so a stale result can never land after the invalidation that should have
/// removed it.
pub struct StatusCache {
    entries: Cache<(StudentId, NaiveDate), AttendanceStatus>,
    generation: AtomicU64,
    publish: Mutex<()>,
}

impl StatusCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(settings.capacity)
                .time_to_live(settings.time_to_live)
                .build(),
            generation: AtomicU64::new(0),
            publish: Mutex::new(()),
        }
    }

    pub fn peek(&self, student: StudentId, date: NaiveDate) -> Option<AttendanceStatus> {
        self.entries.get(&(student, date))
    }

    /// Returns the cached status, or runs `derive` and caches its result.
    ///
    /// Errors from `derive` are returned and nothing is cached.
    pub fn get_or_derive<E, F>(
        &self,
        student: StudentId,
        date: NaiveDate,
        derive: F,
    ) -> Result<AttendanceStatus, E>
    where
        F: FnOnce() -> Result<AttendanceStatus, E>,
    {
        if let Some(status) = self.peek(student, date) {
            return Ok(status);
        }
        let observed = self.generation.load(Ordering::Acquire);
        let status = derive()?;
        let _guard = self.publish.lock().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::Acquire) == observed {
            self.entries.insert((student, date), status);
        }
        Ok(status)
    }

    /// Drops one key. Call once the write that changed it has committed or
    /// rolled back.
    pub fn invalidate(&self, student: StudentId, date: NaiveDate) {
        let _guard = self.publish.lock().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.invalidate(&(student, date));
    }

    pub fn invalidate_all(&self) {
        let _guard = self.publish.lock().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.invalidate_all();
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}
