use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{
    record::{AttendanceEntry, TimePunches},
    time_code,
};

/// Canonical classification of a student's day. Always derived from the
/// entry's punches, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    HalfDay,
    Excused,
    Holiday,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 5] = [
        AttendanceStatus::Present,
        AttendanceStatus::Absent,
        AttendanceStatus::HalfDay,
        AttendanceStatus::Excused,
        AttendanceStatus::Holiday,
    ];

    /// Short code shown in grid cells.
    pub fn symbol(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "✓",
            AttendanceStatus::Absent => "✗",
            AttendanceStatus::HalfDay => "½",
            AttendanceStatus::Excused => "E",
            AttendanceStatus::Holiday => "H",
        }
    }

    /// Long form used by exports and reports.
    pub fn label(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::HalfDay => "Half Day",
            AttendanceStatus::Excused => "Excused",
            AttendanceStatus::Holiday => "Holiday",
        }
    }

    /// Payroll credit earned for one day in this status.
    pub fn day_credit(self) -> Decimal {
        match self {
            AttendanceStatus::Present | AttendanceStatus::Excused | AttendanceStatus::Holiday => {
                Decimal::ONE
            }
            AttendanceStatus::HalfDay => dec!(0.5),
            AttendanceStatus::Absent => Decimal::ZERO,
        }
    }

    /// The punches written when a caller sets this status directly.
    pub fn punches(self) -> TimePunches {
        match self {
            AttendanceStatus::Present => TimePunches::new(730, 1130, 1300, 1630),
            AttendanceStatus::HalfDay => TimePunches::new(730, 1130, 0, 0),
            AttendanceStatus::Absent => TimePunches::uniform(time_code::ABSENT),
            AttendanceStatus::Excused => TimePunches::uniform(time_code::EXCUSED),
            AttendanceStatus::Holiday => TimePunches::uniform(time_code::HOLIDAY),
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Derives the status of an optional ledger row. A missing row is Absent.
pub fn derive_status(entry: Option<&AttendanceEntry>) -> AttendanceStatus {
    match entry {
        Some(entry) => derive_from_punches(&entry.punches()),
        None => AttendanceStatus::Absent,
    }
}

/// Whole-day sentinels are checked before partial punches, holiday first.
pub fn derive_from_punches(punches: &TimePunches) -> AttendanceStatus {
    if punches.all_equal(time_code::HOLIDAY) {
        return AttendanceStatus::Holiday;
    }
    if punches.all_equal(time_code::EXCUSED) {
        return AttendanceStatus::Excused;
    }
    match (punches.has_morning(), punches.has_afternoon()) {
        (true, true) => AttendanceStatus::Present,
        (true, false) | (false, true) => AttendanceStatus::HalfDay,
        (false, false) => AttendanceStatus::Absent,
    }
}
