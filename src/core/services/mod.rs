//! Stateless entry points for view and reporting callers. Every operation takes
//! the [`LedgerContext`](crate::core::ledger_context::LedgerContext) explicitly.

pub mod attendance_service;
pub mod holiday_service;
pub mod payroll_service;

pub use attendance_service::{AttendanceService, PendingEdit, StatusReader, StudentMonth};
pub use holiday_service::HolidayService;
pub use payroll_service::{PayrollLine, PayrollService, WeekCredit};
