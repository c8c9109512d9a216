use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::time_code;

/// Opaque reference to a student owned by the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub u64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for StudentId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Ledger row identifying one calendar date ("attendance record").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub id: u64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDay {
    pub fn new(id: u64, date: NaiveDate) -> Self {
        Self {
            id,
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }

    /// The date this row stands for, or `None` if the stored triple is not a real date.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    pub fn is_on(&self, date: NaiveDate) -> bool {
        self.year == date.year() && self.month == date.month() && self.day == date.day()
    }
}

/// The four raw punch fields of an entry, in HHMM or sentinel encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimePunches {
    pub time_in_am: i32,
    pub time_out_am: i32,
    pub time_in_pm: i32,
    pub time_out_pm: i32,
}

impl TimePunches {
    pub const fn new(time_in_am: i32, time_out_am: i32, time_in_pm: i32, time_out_pm: i32) -> Self {
        Self {
            time_in_am,
            time_out_am,
            time_in_pm,
            time_out_pm,
        }
    }

    /// All four fields set to the same code; used for the whole-day sentinels.
    pub const fn uniform(code: i32) -> Self {
        Self::new(code, code, code, code)
    }

    pub fn fields(&self) -> [i32; 4] {
        [
            self.time_in_am,
            self.time_out_am,
            self.time_in_pm,
            self.time_out_pm,
        ]
    }

    pub fn all_equal(&self, code: i32) -> bool {
        self.fields().iter().all(|field| *field == code)
    }

    pub fn has_morning(&self) -> bool {
        time_code::is_punch(self.time_in_am) && time_code::is_punch(self.time_out_am)
    }

    pub fn has_afternoon(&self) -> bool {
        time_code::is_punch(self.time_in_pm) && time_code::is_punch(self.time_out_pm)
    }

    /// Returns the first field that is neither unset nor a well-formed clock time.
    pub fn first_malformed(&self) -> Option<i32> {
        self.fields()
            .into_iter()
            .find(|code| *code != time_code::ABSENT && !time_code::is_punch(*code))
    }
}

/// Ledger row holding one student's punches for one calendar day ("attendance log").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub id: u64,
    pub calendar_day_id: u64,
    pub student_id: StudentId,
    pub time_in_am: i32,
    pub time_out_am: i32,
    pub time_in_pm: i32,
    pub time_out_pm: i32,
}

impl AttendanceEntry {
    /// A freshly created entry with every punch unset.
    pub fn blank(id: u64, calendar_day_id: u64, student_id: StudentId) -> Self {
        Self::with_punches(id, calendar_day_id, student_id, TimePunches::default())
    }

    pub fn with_punches(
        id: u64,
        calendar_day_id: u64,
        student_id: StudentId,
        punches: TimePunches,
    ) -> Self {
        Self {
            id,
            calendar_day_id,
            student_id,
            time_in_am: punches.time_in_am,
            time_out_am: punches.time_out_am,
            time_in_pm: punches.time_in_pm,
            time_out_pm: punches.time_out_pm,
        }
    }

    pub fn punches(&self) -> TimePunches {
        TimePunches::new(
            self.time_in_am,
            self.time_out_am,
            self.time_in_pm,
            self.time_out_pm,
        )
    }

    pub fn set_punches(&mut self, punches: TimePunches) {
        self.time_in_am = punches.time_in_am;
        self.time_out_am = punches.time_out_am;
        self.time_in_pm = punches.time_in_pm;
        self.time_out_pm = punches.time_out_pm;
    }
}
