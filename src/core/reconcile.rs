//! Find-or-create reconciliation of calendar days and attendance entries.
//!
//! A [`UnitOfWork`] applies changes to the store one row at a time and keeps
//! an undo log, so a failure part-way through can be reverted before the
//! operation is retried or reported.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{debug, error};

use crate::{
    domain::{AttendanceEntry, CalendarDay, StudentId, TimePunches},
    errors::{LedgerError, Result},
    storage::LedgerStore,
};

/// Point-in-time copy of both ledger tables.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    calendar_days: Vec<CalendarDay>,
    entries: Vec<AttendanceEntry>,
    holidays: BTreeSet<NaiveDate>,
}

impl LedgerSnapshot {
    pub fn load(store: &dyn LedgerStore) -> Result<Self> {
        Ok(Self {
            calendar_days: store.list_calendar_days()?,
            entries: store.list_entries()?,
            holidays: store.list_holidays()?.into_iter().collect(),
        })
    }

    pub fn calendar_days(&self) -> &[CalendarDay] {
        &self.calendar_days
    }

    pub fn entries(&self) -> &[AttendanceEntry] {
        &self.entries
    }

    /// The unique calendar day for `date`; two rows for one date is a violation.
    pub fn calendar_day(&self, date: NaiveDate) -> Result<Option<CalendarDay>> {
        let mut matches = self.calendar_days.iter().filter(|day| day.is_on(date));
        let first = matches.next().copied();
        if let Some(second) = matches.next() {
            let message = format!(
                "calendar days {} and {} both represent {}",
                first.map(|day| day.id).unwrap_or_default(),
                second.id,
                date
            );
            error!(%date, "{}", message);
            return Err(LedgerError::InvariantViolation(message));
        }
        Ok(first)
    }

    /// The unique entry for `(student, day)`; duplicates are a violation.
    pub fn entry(
        &self,
        student: StudentId,
        calendar_day_id: u64,
    ) -> Result<Option<AttendanceEntry>> {
        let mut matches = self.entries.iter().filter(|entry| {
            entry.student_id == student && entry.calendar_day_id == calendar_day_id
        });
        let first = matches.next().copied();
        if let Some(second) = matches.next() {
            let message = format!(
                "entries {} and {} both belong to student {} on calendar day {}",
                first.map(|entry| entry.id).unwrap_or_default(),
                second.id,
                student,
                calendar_day_id
            );
            error!(%student, calendar_day_id, "{}", message);
            return Err(LedgerError::InvariantViolation(message));
        }
        Ok(first)
    }

    /// Resolves the entry for a student on a date, if both rows exist.
    pub fn entry_on(
        &self,
        student: StudentId,
        date: NaiveDate,
    ) -> Result<Option<AttendanceEntry>> {
        match self.calendar_day(date)? {
            Some(day) => self.entry(student, day.id),
            None => Ok(None),
        }
    }

    pub fn entries_for_day(&self, calendar_day_id: u64) -> Vec<AttendanceEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.calendar_day_id == calendar_day_id)
            .copied()
            .collect()
    }

    /// Dates flagged by holiday marking.
    pub fn holiday_dates(&self) -> &BTreeSet<NaiveDate> {
        &self.holidays
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    fn next_calendar_day_id(&self) -> u64 {
        self.calendar_days.iter().map(|day| day.id).max().unwrap_or(0) + 1
    }

    fn next_entry_id(&self) -> u64 {
        self.entries.iter().map(|entry| entry.id).max().unwrap_or(0) + 1
    }
}

#[derive(Debug)]
enum Undo {
    InsertedDay(CalendarDay),
    InsertedEntry(AttendanceEntry),
    UpdatedEntry(AttendanceEntry),
    DeletedEntry(AttendanceEntry),
    DeletedDay(CalendarDay, Vec<AttendanceEntry>),
    FlaggedHoliday(NaiveDate),
    ClearedHoliday(NaiveDate),
}

/// Changes that only become visible once the unit of work commits.
#[derive(Debug, Default)]
pub struct CommitEffects {
    pub touched: Vec<(StudentId, NaiveDate)>,
    pub holidays_marked: Vec<NaiveDate>,
    pub holidays_cleared: Vec<NaiveDate>,
}

/// One attempt at a ledger mutation. Every store write is recorded so the
/// attempt can be reverted with [`UnitOfWork::rollback`].
pub struct UnitOfWork<'a> {
    store: &'a dyn LedgerStore,
    snapshot: LedgerSnapshot,
    undo: Vec<Undo>,
    effects: CommitEffects,
}

impl<'a> UnitOfWork<'a> {
    pub fn begin(store: &'a dyn LedgerStore) -> Result<Self> {
        Ok(Self {
            store,
            snapshot: LedgerSnapshot::load(store)?,
            undo: Vec::new(),
            effects: CommitEffects::default(),
        })
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.snapshot
    }

    /// Returns the calendar day for `date`, inserting it with the next free id if missing.
    pub fn find_or_create_day(&mut self, date: NaiveDate) -> Result<CalendarDay> {
        if let Some(day) = self.snapshot.calendar_day(date)? {
            return Ok(day);
        }
        let day = CalendarDay::new(self.snapshot.next_calendar_day_id(), date);
        debug!(id = day.id, %date, "allocating calendar day");
        self.store.insert_calendar_day(&day)?;
        self.undo.push(Undo::InsertedDay(day));
        self.snapshot.calendar_days.push(day);
        Ok(day)
    }

    /// Returns the student's entry for `date`, creating the day and a blank entry as needed.
    pub fn find_or_create_entry(
        &mut self,
        student: StudentId,
        date: NaiveDate,
    ) -> Result<AttendanceEntry> {
        let day = self.find_or_create_day(date)?;
        if let Some(entry) = self.snapshot.entry(student, day.id)? {
            return Ok(entry);
        }
        let entry = AttendanceEntry::blank(self.snapshot.next_entry_id(), day.id, student);
        debug!(id = entry.id, %student, %date, "allocating attendance entry");
        self.store.insert_entry(&entry)?;
        self.undo.push(Undo::InsertedEntry(entry));
        self.snapshot.entries.push(entry);
        self.effects.touched.push((student, date));
        Ok(entry)
    }

    /// Overwrites the punches of an existing entry. Unchanged punches skip the store.
    pub fn write_punches(
        &mut self,
        entry: AttendanceEntry,
        date: NaiveDate,
        punches: TimePunches,
    ) -> Result<AttendanceEntry> {
        if entry.punches() == punches {
            return Ok(entry);
        }
        let mut updated = entry;
        updated.set_punches(punches);
        self.store.update_entry(&updated)?;
        self.undo.push(Undo::UpdatedEntry(entry));
        if let Some(slot) = self.snapshot.entries.iter_mut().find(|row| row.id == entry.id) {
            *slot = updated;
        }
        self.effects.touched.push((entry.student_id, date));
        Ok(updated)
    }

    pub fn delete_entry(&mut self, entry: AttendanceEntry, date: NaiveDate) -> Result<()> {
        self.store.delete_entry(&entry)?;
        self.undo.push(Undo::DeletedEntry(entry));
        self.snapshot.entries.retain(|row| row.id != entry.id);
        self.effects.touched.push((entry.student_id, date));
        Ok(())
    }

    /// Deletes the day and, through the store's cascade, all of its entries.
    pub fn delete_day(&mut self, day: CalendarDay, date: NaiveDate) -> Result<()> {
        let entries = self.snapshot.entries_for_day(day.id);
        self.store.delete_calendar_day(&day)?;
        self.snapshot.calendar_days.retain(|row| row.id != day.id);
        self.snapshot
            .entries
            .retain(|row| row.calendar_day_id != day.id);
        self.effects
            .touched
            .extend(entries.iter().map(|entry| (entry.student_id, date)));
        self.undo.push(Undo::DeletedDay(day, entries));
        Ok(())
    }

    /// Adds `date` to the holiday set. Flagging an already flagged date only
    /// republishes it.
    pub fn flag_holiday(&mut self, date: NaiveDate) -> Result<()> {
        if !self.snapshot.is_holiday(date) {
            self.store.insert_holiday(date)?;
            self.undo.push(Undo::FlaggedHoliday(date));
            self.snapshot.holidays.insert(date);
        }
        self.effects.holidays_marked.push(date);
        Ok(())
    }

    pub fn clear_holiday(&mut self, date: NaiveDate) -> Result<()> {
        if self.snapshot.is_holiday(date) {
            self.store.delete_holiday(date)?;
            self.undo.push(Undo::ClearedHoliday(date));
            self.snapshot.holidays.remove(&date);
        }
        self.effects.holidays_cleared.push(date);
        Ok(())
    }

    /// Accepts the attempt and hands back the effects to publish.
    pub fn commit(self) -> CommitEffects {
        self.effects
    }

    /// Reverts every recorded write, newest first, and returns the keys the
    /// attempt had touched. Failures are logged; the next attempt reconciles
    /// against whatever remains.
    pub fn rollback(self) -> Vec<(StudentId, NaiveDate)> {
        for step in self.undo.into_iter().rev() {
            let outcome = match &step {
                Undo::InsertedDay(day) => self.store.delete_calendar_day(day),
                Undo::InsertedEntry(entry) => self.store.delete_entry(entry),
                Undo::UpdatedEntry(previous) => self.store.update_entry(previous),
                Undo::DeletedEntry(entry) => self.store.insert_entry(entry),
                Undo::DeletedDay(day, entries) => {
                    self.store.insert_calendar_day(day).and_then(|_| {
                        entries
                            .iter()
                            .try_for_each(|entry| self.store.insert_entry(entry))
                    })
                }
                Undo::FlaggedHoliday(date) => self.store.delete_holiday(*date),
                Undo::ClearedHoliday(date) => self.store.insert_holiday(*date),
            };
            if let Err(err) = outcome {
                error!(?step, error = %err, "failed to revert ledger write");
            }
        }
        self.effects.touched
    }
}
