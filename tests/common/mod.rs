#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
};

use attendance_core::{
    config::EngineConfig,
    core::LedgerContext,
    domain::{AttendanceEntry, CalendarDay},
    storage::{InMemoryLedgerStore, JsonLedgerStore, LedgerStore, StoreError, StoreResult},
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Engine settings with a 1ms backoff so retry tests stay fast.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        retry_backoff_ms: 1,
        ..EngineConfig::default()
    }
}

pub fn memory_context() -> LedgerContext {
    context_over(Arc::new(InMemoryLedgerStore::new()))
}

pub fn context_over(store: Arc<dyn LedgerStore>) -> LedgerContext {
    LedgerContext::open(store, fast_config()).expect("open ledger context")
}

/// Creates a unique directory kept alive for the whole test run.
pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn json_store(base: &Path) -> Arc<JsonLedgerStore> {
    Arc::new(JsonLedgerStore::new(Some(base.to_path_buf())).expect("create json ledger store"))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

type UpdateHook = Box<dyn Fn() + Send + Sync>;

/// In-memory store whose entry inserts fail a configured number of times,
/// optionally after letting some inserts through first.
pub struct FlakyStore {
    inner: InMemoryLedgerStore,
    passes_before_failure: AtomicU32,
    remaining_failures: AtomicU32,
    failure: StoreError,
    entry_insert_calls: AtomicU32,
    after_update: Mutex<Option<UpdateHook>>,
}

impl FlakyStore {
    pub fn failing_entry_inserts(times: u32, failure: StoreError) -> Self {
        Self::failing_after_entry_inserts(0, times, failure)
    }

    pub fn failing_after_entry_inserts(passes: u32, times: u32, failure: StoreError) -> Self {
        Self {
            inner: InMemoryLedgerStore::new(),
            passes_before_failure: AtomicU32::new(passes),
            remaining_failures: AtomicU32::new(times),
            failure,
            entry_insert_calls: AtomicU32::new(0),
            after_update: Mutex::new(None),
        }
    }

    pub fn entry_insert_calls(&self) -> u32 {
        self.entry_insert_calls.load(Ordering::SeqCst)
    }

    /// Runs `hook` after every successful entry update, while the write that
    /// issued it is still in progress.
    pub fn after_update(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.after_update.lock().expect("lock update hook") = Some(Box::new(hook));
    }

    fn take_failure(&self) -> bool {
        let passed = self
            .passes_before_failure
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if passed {
            return false;
        }
        self.remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

impl LedgerStore for FlakyStore {
    fn list_calendar_days(&self) -> StoreResult<Vec<CalendarDay>> {
        self.inner.list_calendar_days()
    }

    fn insert_calendar_day(&self, day: &CalendarDay) -> StoreResult<()> {
        self.inner.insert_calendar_day(day)
    }

    fn delete_calendar_day(&self, day: &CalendarDay) -> StoreResult<()> {
        self.inner.delete_calendar_day(day)
    }

    fn list_entries(&self) -> StoreResult<Vec<AttendanceEntry>> {
        self.inner.list_entries()
    }

    fn insert_entry(&self, entry: &AttendanceEntry) -> StoreResult<()> {
        self.entry_insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.take_failure() {
            return Err(self.failure.clone());
        }
        self.inner.insert_entry(entry)
    }

    fn update_entry(&self, entry: &AttendanceEntry) -> StoreResult<()> {
        self.inner.update_entry(entry)?;
        if let Some(hook) = self.after_update.lock().expect("lock update hook").as_ref() {
            hook();
        }
        Ok(())
    }

    fn delete_entry(&self, entry: &AttendanceEntry) -> StoreResult<()> {
        self.inner.delete_entry(entry)
    }

    fn list_holidays(&self) -> StoreResult<Vec<NaiveDate>> {
        self.inner.list_holidays()
    }

    fn insert_holiday(&self, date: NaiveDate) -> StoreResult<()> {
        self.inner.insert_holiday(date)
    }

    fn delete_holiday(&self, date: NaiveDate) -> StoreResult<()> {
        self.inner.delete_holiday(date)
    }
}
