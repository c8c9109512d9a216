//! Ledger rows, derived statuses, and calendar structure. Everything here is
//! pure: no I/O, no shared state.

pub mod calendar;
pub mod payroll;
pub mod record;
pub mod status;
pub mod time_code;

pub use calendar::{
    business_days, group_into_weeks, AcademicYear, WeekSplit, WeekWindow, YearMonth,
};
pub use payroll::{FareType, PayrollCredit};
pub use record::{AttendanceEntry, CalendarDay, StudentId, TimePunches};
pub use status::{derive_from_punches, derive_status, AttendanceStatus};
