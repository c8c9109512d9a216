//! Business-day and week bucketing used by reporting columns and payroll.

use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

/// A validated `(month, year)` selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(LedgerError::InvalidInput(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(LedgerError::InvalidInput(format!(
                "year {year} is outside the supported calendar"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        (28..=31)
            .rev()
            .find_map(|day| NaiveDate::from_ymd_opt(self.year, self.month, day))
            .unwrap_or_else(|| self.first_day())
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Every calendar day of the month, weekends included.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let Self { year, month } = *self;
        (1..=self.last_day().day())
            .filter_map(move |day| NaiveDate::from_ymd_opt(year, month, day))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first_day().format("%B %Y"))
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// All days of `month` except Saturdays and Sundays, in order.
///
/// Holidays stay in the sequence; they are a status overlay, not a calendar category.
pub fn business_days(month: YearMonth) -> Vec<NaiveDate> {
    month.days().filter(|day| !is_weekend(*day)).collect()
}

/// Rule deciding where one [`WeekWindow`] ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekSplit {
    /// A new window starts at every Monday. Exact for [`business_days`] output,
    /// which always contains each Monday of the month.
    #[default]
    MondayStart,
    /// A new window starts whenever the ISO week number changes. Use this for
    /// sequences that may be missing a Monday, such as filtered day lists.
    IsoWeek,
}

/// An ordered run of business days treated as one reporting week. Only
/// [`group_into_weeks`] builds windows, so a window is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekWindow {
    days: Vec<NaiveDate>,
}

impl WeekWindow {
    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn start(&self) -> NaiveDate {
        self.days[0]
    }

    pub fn end(&self) -> NaiveDate {
        self.days[self.days.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.binary_search(&date).is_ok()
    }
}

/// Splits an ordered day sequence into week windows. No window is ever empty.
pub fn group_into_weeks(days: &[NaiveDate], split: WeekSplit) -> Vec<WeekWindow> {
    let mut weeks: Vec<WeekWindow> = Vec::new();
    let mut current: Vec<NaiveDate> = Vec::new();
    for &day in days {
        let starts_new = match (split, current.last()) {
            (_, None) => false,
            (WeekSplit::MondayStart, Some(_)) => day.weekday() == Weekday::Mon,
            (WeekSplit::IsoWeek, Some(previous)) => previous.iso_week() != day.iso_week(),
        };
        if starts_new {
            weeks.push(WeekWindow {
                days: std::mem::take(&mut current),
            });
        }
        current.push(day);
    }
    if !current.is_empty() {
        weeks.push(WeekWindow { days: current });
    }
    weeks
}

/// Inclusive date range of one school year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYear {
    start: NaiveDate,
    end: NaiveDate,
}

impl AcademicYear {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(LedgerError::InvalidInput(format!(
                "academic year ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Months touched by the academic year, in order.
    pub fn months(&self) -> Vec<YearMonth> {
        let last = YearMonth::of(self.end);
        let mut months = Vec::new();
        let mut month = YearMonth::of(self.start);
        while month <= last {
            months.push(month);
            month = month.next();
        }
        months
    }

    /// Business days of `month` that fall inside the academic year.
    pub fn business_days(&self, month: YearMonth) -> Vec<NaiveDate> {
        business_days(month)
            .into_iter()
            .filter(|day| self.contains(*day))
            .collect()
    }
}
