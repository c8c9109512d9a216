use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::AttendanceStatus;

/// Transport fare arrangement; the discriminant is the fare multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FareType {
    OneWay = 1,
    TwoWay = 2,
    FourWay = 4,
}

impl FareType {
    pub fn multiplier(self) -> Decimal {
        Decimal::from(self as u32)
    }
}

/// Day credit accumulated by one student over a set of business days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PayrollCredit {
    pub days: Decimal,
    pub present: u32,
    pub half_days: u32,
    pub excused: u32,
    pub holidays: u32,
    pub absent: u32,
}

impl PayrollCredit {
    pub fn record(&mut self, status: AttendanceStatus) {
        self.days += status.day_credit();
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::HalfDay => self.half_days += 1,
            AttendanceStatus::Excused => self.excused += 1,
            AttendanceStatus::Holiday => self.holidays += 1,
            AttendanceStatus::Absent => self.absent += 1,
        }
    }

    /// Monetary total: credited days times the daily fare times the fare multiplier.
    pub fn amount(&self, daily_fare: Decimal, fare_type: FareType) -> Decimal {
        self.days * daily_fare * fare_type.multiplier()
    }

    pub fn days_counted(&self) -> u32 {
        self.present + self.half_days + self.excused + self.holidays + self.absent
    }
}

impl FromIterator<AttendanceStatus> for PayrollCredit {
    fn from_iter<I: IntoIterator<Item = AttendanceStatus>>(iter: I) -> Self {
        let mut credit = PayrollCredit::default();
        for status in iter {
            credit.record(status);
        }
        credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn accumulates_fractional_days() {
        let credit: PayrollCredit = [
            AttendanceStatus::Present,
            AttendanceStatus::HalfDay,
            AttendanceStatus::Excused,
            AttendanceStatus::Holiday,
            AttendanceStatus::Absent,
        ]
        .into_iter()
        .collect();
        assert_eq!(credit.days, dec!(3.5));
        assert_eq!(credit.days_counted(), 5);
        assert_eq!(credit.half_days, 1);
    }

    #[test]
    fn amount_applies_fare_and_multiplier() {
        let credit: PayrollCredit = std::iter::repeat(AttendanceStatus::Present)
            .take(4)
            .chain([AttendanceStatus::HalfDay])
            .collect();
        assert_eq!(credit.amount(dec!(20), FareType::TwoWay), dec!(180));
        assert_eq!(FareType::FourWay.multiplier(), dec!(4));
    }
}
