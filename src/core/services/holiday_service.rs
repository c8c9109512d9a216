use chrono::NaiveDate;
use tracing::info;

use crate::core::ledger_context::LedgerContext;
use crate::domain::{time_code, StudentId, TimePunches, YearMonth};
use crate::errors::{LedgerError, Result};

/// Bulk holiday marking for one date.
pub struct HolidayService;

impl HolidayService {
    /// Sets the holiday sentinel on every listed student's entry for `date`.
    ///
    /// All entries are written and the date is flagged in one critical
    /// section; on failure neither the entries nor the flag remain.
    pub fn mark_holiday(
        ctx: &LedgerContext,
        date: NaiveDate,
        students: &[StudentId],
    ) -> Result<usize> {
        if students.is_empty() {
            return Err(LedgerError::InvalidInput(format!(
                "no students given to mark {date} as a holiday"
            )));
        }
        let holiday = TimePunches::uniform(time_code::HOLIDAY);
        let marked = ctx.write("mark_holiday", None, |work| {
            for &student in students {
                let entry = work.find_or_create_entry(student, date)?;
                work.write_punches(entry, date, holiday)?;
            }
            work.flag_holiday(date)?;
            Ok(students.len())
        })?;
        info!(%date, students = marked, "holiday marked");
        Ok(marked)
    }

    /// Clears the holiday flag for `date` and removes its holiday entries. The
    /// calendar day goes with them unless other entries still reference it.
    /// Returns the entries removed.
    pub fn unmark_holiday(ctx: &LedgerContext, date: NaiveDate) -> Result<usize> {
        let removed = ctx.write("unmark_holiday", None, |work| {
            work.clear_holiday(date)?;
            let Some(day) = work.snapshot().calendar_day(date)? else {
                return Ok(0);
            };
            let entries = work.snapshot().entries_for_day(day.id);
            let (holidays, others): (Vec<_>, Vec<_>) = entries
                .into_iter()
                .partition(|entry| entry.punches().all_equal(time_code::HOLIDAY));
            if others.is_empty() {
                work.delete_day(day, date)?;
            } else {
                for entry in &holidays {
                    work.delete_entry(*entry, date)?;
                }
            }
            Ok(holidays.len())
        })?;
        info!(%date, entries = removed, "holiday unmarked");
        Ok(removed)
    }

    /// Holiday-flagged dates within `month`, for reporting overlays.
    pub fn holidays_in(ctx: &LedgerContext, month: YearMonth) -> Vec<NaiveDate> {
        ctx.holiday_dates()
            .into_iter()
            .filter(|date| month.contains(*date))
            .collect()
    }
}
