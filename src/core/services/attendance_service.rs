//! Status edits and lookups for one student on one date.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error};

use crate::core::ledger_context::{EditGate, LedgerContext};
use crate::core::reconcile::LedgerSnapshot;
use crate::domain::{
    business_days, derive_status, AttendanceEntry, AttendanceStatus, StudentId, TimePunches,
    YearMonth,
};
use crate::errors::{LedgerError, Result};

/// Reconciles status edits against the ledger and answers status queries.
pub struct AttendanceService;

impl AttendanceService {
    /// Returns the student's entry for `date`, creating the calendar day and a
    /// blank entry when they do not exist yet.
    pub fn find_or_create_entry(
        ctx: &LedgerContext,
        student: StudentId,
        date: NaiveDate,
    ) -> Result<AttendanceEntry> {
        ctx.write("find_or_create_entry", None, |work| {
            work.find_or_create_entry(student, date)
        })
    }

    /// Writes the canonical punches for `status`. Repeating the same call is a no-op.
    pub fn set_status(
        ctx: &LedgerContext,
        student: StudentId,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Result<AttendanceEntry> {
        Self::write_punches(ctx, None, student, date, status.punches())
    }

    /// Records raw clock punches. Each field must be unset (0) or a valid HHMM time.
    pub fn record_punches(
        ctx: &LedgerContext,
        student: StudentId,
        date: NaiveDate,
        punches: TimePunches,
    ) -> Result<AttendanceEntry> {
        if let Some(code) = punches.first_malformed() {
            return Err(LedgerError::InvalidInput(format!(
                "{code} is not a valid HHMM punch"
            )));
        }
        Self::write_punches(ctx, None, student, date, punches)
    }

    /// Runs [`AttendanceService::set_status`] on a worker thread.
    ///
    /// The returned handle can cancel the edit until it enters the critical section.
    pub fn spawn_set_status(
        ctx: Arc<LedgerContext>,
        student: StudentId,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> PendingEdit {
        let gate = Arc::new(EditGate::new());
        let worker_gate = Arc::clone(&gate);
        let handle = thread::spawn(move || {
            Self::write_punches(&ctx, Some(&worker_gate), student, date, status.punches())
        });
        PendingEdit { gate, handle }
    }

    fn write_punches(
        ctx: &LedgerContext,
        gate: Option<&EditGate>,
        student: StudentId,
        date: NaiveDate,
        punches: TimePunches,
    ) -> Result<AttendanceEntry> {
        let entry = ctx.write("set_status", gate, |work| {
            let entry = work.find_or_create_entry(student, date)?;
            work.write_punches(entry, date, punches)
        })?;
        debug!(%student, %date, entry = entry.id, "attendance entry written");
        Ok(entry)
    }

    /// Status for one student on one date, served from the cache when possible.
    pub fn get_status(
        ctx: &LedgerContext,
        student: StudentId,
        date: NaiveDate,
    ) -> Result<AttendanceStatus> {
        StatusReader::new(ctx).status(student, date)
    }

    /// The raw ledger entry, if one exists.
    pub fn entry(
        ctx: &LedgerContext,
        student: StudentId,
        date: NaiveDate,
    ) -> Result<Option<AttendanceEntry>> {
        ctx.snapshot()?.entry_on(student, date)
    }

    /// One row of statuses per student across the month's business days.
    pub fn month_grid(
        ctx: &LedgerContext,
        students: &[StudentId],
        month: YearMonth,
    ) -> Result<Vec<StudentMonth>> {
        let days = business_days(month);
        let mut reader = StatusReader::new(ctx);
        students
            .iter()
            .map(|&student| {
                let statuses = days
                    .iter()
                    .map(|&date| reader.status(student, date))
                    .collect::<Result<Vec<_>>>()?;
                Ok(StudentMonth {
                    student,
                    month,
                    days: days.iter().copied().zip(statuses).collect(),
                })
            })
            .collect()
    }
}

/// Statuses of one student over a month, in business-day order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentMonth {
    pub student: StudentId,
    pub month: YearMonth,
    pub days: Vec<(NaiveDate, AttendanceStatus)>,
}

impl StudentMonth {
    pub fn status_on(&self, date: NaiveDate) -> Option<AttendanceStatus> {
        self.days
            .iter()
            .find(|(day, _)| *day == date)
            .map(|(_, status)| *status)
    }

    /// Grid cell codes, one per business day.
    pub fn symbols(&self) -> Vec<&'static str> {
        self.days.iter().map(|(_, status)| status.symbol()).collect()
    }
}

/// Cache-first status lookups sharing one ledger snapshot across misses.
///
/// The snapshot is reloaded whenever a write has committed since it was taken.
pub struct StatusReader<'a> {
    ctx: &'a LedgerContext,
    snapshot: Option<(u64, LedgerSnapshot)>,
}

impl<'a> StatusReader<'a> {
    pub fn new(ctx: &'a LedgerContext) -> Self {
        Self {
            ctx,
            snapshot: None,
        }
    }

    pub fn status(&mut self, student: StudentId, date: NaiveDate) -> Result<AttendanceStatus> {
        let ctx = self.ctx;
        let cached = &mut self.snapshot;
        ctx.cache().get_or_derive(student, date, || {
            let generation = ctx.cache().generation();
            let snapshot = match cached.take() {
                Some((taken_at, snapshot)) if taken_at == generation => snapshot,
                _ => ctx.snapshot()?,
            };
            let entry = snapshot.entry_on(student, date)?;
            *cached = Some((generation, snapshot));
            Ok(derive_status(entry.as_ref()))
        })
    }
}

/// Handle to a status edit running on a worker thread.
pub struct PendingEdit {
    gate: Arc<EditGate>,
    handle: JoinHandle<Result<AttendanceEntry>>,
}

impl PendingEdit {
    /// Abandons the edit. Returns `false` if it already entered the critical
    /// section, in which case it will run to completion.
    pub fn cancel(&self) -> bool {
        self.gate.cancel()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Blocks until the edit finishes. A cancelled edit yields [`LedgerError::Cancelled`].
    pub fn wait(self) -> Result<AttendanceEntry> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => {
                error!("attendance edit worker panicked");
                Err(LedgerError::WriteFailed {
                    attempts: 0,
                    reason: "edit worker panicked".into(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::time_code;
    use crate::storage::{InMemoryLedgerStore, LedgerStore};

    fn context() -> LedgerContext {
        LedgerContext::with_defaults(Arc::new(InMemoryLedgerStore::new())).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn half_day_writes_morning_punches() {
        let ctx = context();
        let student = StudentId(1);
        let entry =
            AttendanceService::set_status(&ctx, student, date(4), AttendanceStatus::HalfDay)
                .unwrap();
        assert_eq!(entry.punches(), TimePunches::new(730, 1130, 0, 0));
        assert_eq!(
            AttendanceService::get_status(&ctx, student, date(4)).unwrap(),
            AttendanceStatus::HalfDay
        );
    }

    #[test]
    fn status_changes_invalidate_the_cache() {
        let ctx = context();
        let student = StudentId(1);
        assert_eq!(
            AttendanceService::get_status(&ctx, student, date(4)).unwrap(),
            AttendanceStatus::Absent
        );
        assert_eq!(
            ctx.cache().peek(student, date(4)),
            Some(AttendanceStatus::Absent)
        );
        AttendanceService::set_status(&ctx, student, date(4), AttendanceStatus::Present).unwrap();
        assert_eq!(ctx.cache().peek(student, date(4)), None);
        assert_eq!(
            AttendanceService::get_status(&ctx, student, date(4)).unwrap(),
            AttendanceStatus::Present
        );
    }

    #[test]
    fn record_punches_rejects_malformed_times() {
        let ctx = context();
        let punches = TimePunches::new(730, 1175, 0, 0);
        let err = AttendanceService::record_punches(&ctx, StudentId(1), date(4), punches)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidInput(_)));
        assert!(ctx.store().list_calendar_days().unwrap().is_empty());

        let sentinel = TimePunches::uniform(time_code::EXCUSED);
        assert!(AttendanceService::record_punches(&ctx, StudentId(1), date(4), sentinel).is_err());
    }

    #[test]
    fn record_punches_derives_status_from_clock_times() {
        let ctx = context();
        let punches = TimePunches::new(0, 0, 1305, 1640);
        AttendanceService::record_punches(&ctx, StudentId(3), date(5), punches).unwrap();
        assert_eq!(
            AttendanceService::get_status(&ctx, StudentId(3), date(5)).unwrap(),
            AttendanceStatus::HalfDay
        );
    }

    #[test]
    fn month_grid_covers_every_business_day() {
        let ctx = context();
        let month = YearMonth::new(2024, 3).unwrap();
        AttendanceService::set_status(&ctx, StudentId(1), date(4), AttendanceStatus::Excused)
            .unwrap();
        let grid =
            AttendanceService::month_grid(&ctx, &[StudentId(1), StudentId(2)], month).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0].days.len(), 21);
        assert_eq!(grid[0].status_on(date(4)), Some(AttendanceStatus::Excused));
        assert_eq!(grid[1].status_on(date(4)), Some(AttendanceStatus::Absent));
        assert_eq!(grid[0].status_on(date(9)), None);
        assert_eq!(grid[0].symbols()[1], "E");
    }
}
