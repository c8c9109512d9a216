use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use crate::domain::{AttendanceEntry, CalendarDay};

use super::{LedgerStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    calendar_days: Vec<CalendarDay>,
    entries: Vec<AttendanceEntry>,
    holidays: Vec<NaiveDate>,
}

/// Process-local store backed by two vectors, with primary-key checks on insert.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: Mutex<Tables>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing rows, skipping the uniqueness checks.
    pub fn with_rows(calendar_days: Vec<CalendarDay>, entries: Vec<AttendanceEntry>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                calendar_days,
                entries,
                holidays: Vec::new(),
            }),
        }
    }

    /// Seeds the flagged holiday dates.
    pub fn with_holidays(self, holidays: Vec<NaiveDate>) -> Self {
        self.tables().holidays = holidays;
        self
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn list_calendar_days(&self) -> StoreResult<Vec<CalendarDay>> {
        Ok(self.tables().calendar_days.clone())
    }

    fn insert_calendar_day(&self, day: &CalendarDay) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables.calendar_days.iter().any(|existing| existing.id == day.id) {
            return Err(StoreError::Conflict(format!(
                "calendar day id {} already exists",
                day.id
            )));
        }
        tables.calendar_days.push(*day);
        Ok(())
    }

    fn delete_calendar_day(&self, day: &CalendarDay) -> StoreResult<()> {
        let mut tables = self.tables();
        let before = tables.calendar_days.len();
        tables.calendar_days.retain(|existing| existing.id != day.id);
        if tables.calendar_days.len() == before {
            return Err(StoreError::NotFound(format!("calendar day {}", day.id)));
        }
        tables.entries.retain(|entry| entry.calendar_day_id != day.id);
        Ok(())
    }

    fn list_entries(&self) -> StoreResult<Vec<AttendanceEntry>> {
        Ok(self.tables().entries.clone())
    }

    fn insert_entry(&self, entry: &AttendanceEntry) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables.entries.iter().any(|existing| existing.id == entry.id) {
            return Err(StoreError::Conflict(format!(
                "attendance entry id {} already exists",
                entry.id
            )));
        }
        tables.entries.push(*entry);
        Ok(())
    }

    fn update_entry(&self, entry: &AttendanceEntry) -> StoreResult<()> {
        let mut tables = self.tables();
        match tables.entries.iter_mut().find(|existing| existing.id == entry.id) {
            Some(existing) => {
                *existing = *entry;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("attendance entry {}", entry.id))),
        }
    }

    fn delete_entry(&self, entry: &AttendanceEntry) -> StoreResult<()> {
        let mut tables = self.tables();
        let before = tables.entries.len();
        tables.entries.retain(|existing| existing.id != entry.id);
        if tables.entries.len() == before {
            return Err(StoreError::NotFound(format!("attendance entry {}", entry.id)));
        }
        Ok(())
    }

    fn list_holidays(&self) -> StoreResult<Vec<NaiveDate>> {
        Ok(self.tables().holidays.clone())
    }

    fn insert_holiday(&self, date: NaiveDate) -> StoreResult<()> {
        let mut tables = self.tables();
        if tables.holidays.contains(&date) {
            return Err(StoreError::Conflict(format!("{date} is already a holiday")));
        }
        tables.holidays.push(date);
        Ok(())
    }

    fn delete_holiday(&self, date: NaiveDate) -> StoreResult<()> {
        let mut tables = self.tables();
        let before = tables.holidays.len();
        tables.holidays.retain(|existing| *existing != date);
        if tables.holidays.len() == before {
            return Err(StoreError::NotFound(format!("holiday {date}")));
        }
        Ok(())
    }
}
