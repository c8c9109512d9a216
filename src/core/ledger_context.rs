use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::{
    config::EngineConfig,
    core::{
        reconcile::{LedgerSnapshot, UnitOfWork},
        retry::RetryPolicy,
        status_cache::StatusCache,
    },
    domain::WeekSplit,
    errors::{LedgerError, Result},
    storage::{JsonLedgerStore, LedgerStore},
};

const GATE_PENDING: u8 = 0;
const GATE_ENTERED: u8 = 1;
const GATE_CANCELLED: u8 = 2;

/// One-shot latch deciding whether a queued edit may still be cancelled.
///
/// Cancellation wins only while the edit is waiting for the write lock; once
/// the edit has entered the critical section it runs to completion.
#[derive(Debug, Default)]
pub struct EditGate {
    state: AtomicU8,
}

impl EditGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the edit had not yet entered the critical section.
    pub fn cancel(&self) -> bool {
        self.state
            .compare_exchange(GATE_PENDING, GATE_CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn enter(&self) -> bool {
        self.state
            .compare_exchange(GATE_PENDING, GATE_ENTERED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) == GATE_CANCELLED
    }
}

/// Everything an engine call needs: the store, the status cache, the write
/// lock guarding id allocation, and the holiday overlay.
pub struct LedgerContext {
    store: Arc<dyn LedgerStore>,
    cache: StatusCache,
    write_lock: Mutex<()>,
    retry: RetryPolicy,
    holidays: RwLock<BTreeSet<NaiveDate>>,
    config: EngineConfig,
}

impl LedgerContext {
    /// Builds a context over `store`, seeding the holiday overlay from the
    /// dates the store has flagged.
    pub fn open(store: Arc<dyn LedgerStore>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let holidays: BTreeSet<NaiveDate> = store.list_holidays()?.into_iter().collect();
        info!(holidays = holidays.len(), "attendance ledger opened");
        Ok(Self {
            cache: StatusCache::new(config.cache_settings()),
            retry: config.retry_policy(),
            store,
            write_lock: Mutex::new(()),
            holidays: RwLock::new(holidays),
            config,
        })
    }

    /// Opens the JSON ledger in `config.data_dir`, or the application data
    /// directory when unset.
    pub fn open_json(config: EngineConfig) -> Result<Self> {
        let store = JsonLedgerStore::new(config.data_dir.clone())?;
        Self::open(Arc::new(store), config)
    }

    pub fn with_defaults(store: Arc<dyn LedgerStore>) -> Result<Self> {
        Self::open(store, EngineConfig::default())
    }

    pub fn store(&self) -> &dyn LedgerStore {
        self.store.as_ref()
    }

    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn week_split(&self) -> WeekSplit {
        self.config.week_split
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        LedgerSnapshot::load(self.store())
    }

    pub fn holiday_dates(&self) -> Vec<NaiveDate> {
        self.holidays
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&date)
    }

    /// Holds the write lock while `f` runs, e.g. to copy the backing file
    /// without an edit landing halfway. `f` must not call [`LedgerContext::write`].
    pub fn with_write_lock<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Runs a ledger mutation inside the write lock with bounded retries.
    ///
    /// Each attempt starts from a fresh snapshot; a failed attempt is rolled
    /// back before the next one. Holiday overlay updates happen only after an
    /// attempt commits. Keys touched by a rolled-back attempt are invalidated
    /// too, since a reader may have cached a status from its partial writes.
    pub fn write<T, F>(&self, label: &str, gate: Option<&EditGate>, mut change: F) -> Result<T>
    where
        F: FnMut(&mut UnitOfWork<'_>) -> Result<T>,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(gate) = gate {
            if !gate.enter() {
                debug!(operation = label, "edit cancelled before entering the ledger");
                return Err(LedgerError::Cancelled);
            }
        }
        let (value, effects) = self.retry.run(label, |_attempt| {
            let mut work = UnitOfWork::begin(self.store())?;
            match change(&mut work) {
                Ok(value) => Ok((value, work.commit())),
                Err(err) => {
                    for (student, date) in work.rollback() {
                        self.cache.invalidate(student, date);
                    }
                    Err(err)
                }
            }
        })?;

        for (student, date) in &effects.touched {
            self.cache.invalidate(*student, *date);
        }
        if !effects.holidays_marked.is_empty() || !effects.holidays_cleared.is_empty() {
            let mut holidays = self.holidays.write().unwrap_or_else(PoisonError::into_inner);
            for date in &effects.holidays_cleared {
                holidays.remove(date);
            }
            holidays.extend(effects.holidays_marked.iter().copied());
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        time_code, AttendanceEntry, AttendanceStatus, CalendarDay, StudentId, TimePunches,
    };
    use crate::storage::InMemoryLedgerStore;

    #[test]
    fn gate_cancels_only_before_entry() {
        let gate = EditGate::new();
        assert!(gate.enter());
        assert!(!gate.cancel());

        let gate = EditGate::new();
        assert!(gate.cancel());
        assert!(gate.is_cancelled());
        assert!(!gate.enter());
    }

    #[test]
    fn open_seeds_holidays_from_the_ledger() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let store = InMemoryLedgerStore::new().with_holidays(vec![date]);
        let ctx = LedgerContext::with_defaults(Arc::new(store)).unwrap();
        assert!(ctx.is_holiday(date));
        assert_eq!(ctx.holiday_dates(), vec![date]);
    }

    #[test]
    fn holiday_entries_alone_do_not_flag_a_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let store = InMemoryLedgerStore::with_rows(
            vec![CalendarDay::new(1, date)],
            vec![AttendanceEntry::with_punches(
                1,
                1,
                StudentId(1),
                TimePunches::uniform(time_code::HOLIDAY),
            )],
        );
        let ctx = LedgerContext::with_defaults(Arc::new(store)).unwrap();
        assert!(!ctx.is_holiday(date));
    }

    #[test]
    fn rolled_back_attempts_invalidate_cached_statuses() {
        let ctx = LedgerContext::with_defaults(Arc::new(InMemoryLedgerStore::new())).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let student = StudentId(1);
        let err = ctx
            .write("test", None, |work| {
                let entry = work.find_or_create_entry(student, date)?;
                work.write_punches(entry, date, TimePunches::uniform(time_code::EXCUSED))?;
                ctx.cache().get_or_derive(student, date, || {
                    Ok::<_, LedgerError>(AttendanceStatus::Excused)
                })?;
                assert_eq!(ctx.cache().peek(student, date), Some(AttendanceStatus::Excused));
                Err::<(), _>(LedgerError::InvalidInput("abandoned".into()))
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
        assert_eq!(ctx.cache().peek(student, date), None);
    }

    #[test]
    fn cancelled_gate_leaves_the_ledger_untouched() {
        let ctx = LedgerContext::with_defaults(Arc::new(InMemoryLedgerStore::new())).unwrap();
        let gate = EditGate::new();
        gate.cancel();
        let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let err = ctx
            .write("test", Some(&gate), |work| work.find_or_create_entry(StudentId(1), date))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Cancelled));
        assert!(ctx.store().list_calendar_days().unwrap().is_empty());
    }
}
