//! Monthly transport-fare payroll built from attendance statuses.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::attendance_service::StatusReader;
use crate::core::ledger_context::LedgerContext;
use crate::domain::{
    business_days, group_into_weeks, AcademicYear, FareType, PayrollCredit, StudentId, WeekWindow,
    YearMonth,
};
use crate::errors::Result;

/// Credit earned inside one week window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekCredit {
    pub window: WeekWindow,
    pub credit: PayrollCredit,
}

/// One student's payroll for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollLine {
    pub student: StudentId,
    pub credit: PayrollCredit,
    pub amount: Decimal,
}

pub struct PayrollService;

impl PayrollService {
    /// Day credit over every business day of `month`.
    pub fn credited_days(
        ctx: &LedgerContext,
        student: StudentId,
        month: YearMonth,
    ) -> Result<PayrollCredit> {
        Self::credit_over(&mut StatusReader::new(ctx), student, &business_days(month))
    }

    /// Like [`PayrollService::credited_days`], restricted to days inside `year`.
    pub fn credited_days_in(
        ctx: &LedgerContext,
        student: StudentId,
        month: YearMonth,
        year: &AcademicYear,
    ) -> Result<PayrollCredit> {
        Self::credit_over(
            &mut StatusReader::new(ctx),
            student,
            &year.business_days(month),
        )
    }

    /// Monetary total using the configured daily fare.
    pub fn total_credit(
        ctx: &LedgerContext,
        student: StudentId,
        month: YearMonth,
        fare_type: FareType,
    ) -> Result<Decimal> {
        Self::total_amount(ctx, student, month, ctx.config().daily_fare, fare_type)
    }

    /// Credited days times `daily_fare` times the fare multiplier.
    pub fn total_amount(
        ctx: &LedgerContext,
        student: StudentId,
        month: YearMonth,
        daily_fare: Decimal,
        fare_type: FareType,
    ) -> Result<Decimal> {
        let credit = Self::credited_days(ctx, student, month)?;
        let amount = credit.amount(daily_fare, fare_type);
        debug!(%student, %month, days = %credit.days, %amount, "payroll computed");
        Ok(amount)
    }

    /// Credit per week window, split according to the context's week rule.
    pub fn weekly_credit(
        ctx: &LedgerContext,
        student: StudentId,
        month: YearMonth,
    ) -> Result<Vec<WeekCredit>> {
        let mut reader = StatusReader::new(ctx);
        group_into_weeks(&business_days(month), ctx.week_split())
            .into_iter()
            .map(|window| {
                let credit = Self::credit_over(&mut reader, student, window.days())?;
                Ok(WeekCredit { window, credit })
            })
            .collect()
    }

    /// Payroll lines for several students, in the order given.
    pub fn summarize(
        ctx: &LedgerContext,
        students: &[StudentId],
        month: YearMonth,
        daily_fare: Decimal,
        fare_type: FareType,
    ) -> Result<Vec<PayrollLine>> {
        let days = business_days(month);
        let mut reader = StatusReader::new(ctx);
        students
            .iter()
            .map(|&student| {
                let credit = Self::credit_over(&mut reader, student, &days)?;
                Ok(PayrollLine {
                    student,
                    amount: credit.amount(daily_fare, fare_type),
                    credit,
                })
            })
            .collect()
    }

    fn credit_over(
        reader: &mut StatusReader<'_>,
        student: StudentId,
        days: &[NaiveDate],
    ) -> Result<PayrollCredit> {
        days.iter()
            .map(|&date| reader.status(student, date))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::core::services::AttendanceService;
    use crate::domain::AttendanceStatus;
    use crate::storage::InMemoryLedgerStore;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn march() -> YearMonth {
        YearMonth::new(2024, 3).unwrap()
    }

    fn populated() -> LedgerContext {
        let ctx = LedgerContext::with_defaults(Arc::new(InMemoryLedgerStore::new())).unwrap();
        let student = StudentId(1);
        for d in [4, 5, 6, 7] {
            AttendanceService::set_status(&ctx, student, date(d), AttendanceStatus::Present)
                .unwrap();
        }
        AttendanceService::set_status(&ctx, student, date(8), AttendanceStatus::HalfDay).unwrap();
        ctx
    }

    #[test]
    fn month_total_is_days_times_fare_times_multiplier() {
        let ctx = populated();
        let amount = PayrollService::total_amount(
            &ctx,
            StudentId(1),
            march(),
            dec!(20),
            FareType::TwoWay,
        )
        .unwrap();
        assert_eq!(amount, dec!(4.5) * dec!(20) * dec!(2));

        let credit = PayrollService::credited_days(&ctx, StudentId(1), march()).unwrap();
        assert_eq!(credit.days, dec!(4.5));
        assert_eq!(credit.absent, 16);
    }

    #[test]
    fn configured_fare_defaults_to_zero() {
        let ctx = populated();
        let amount =
            PayrollService::total_credit(&ctx, StudentId(1), march(), FareType::FourWay).unwrap();
        assert_eq!(amount, Decimal::ZERO);
    }

    #[test]
    fn weekly_credit_follows_week_windows() {
        let ctx = populated();
        let weeks = PayrollService::weekly_credit(&ctx, StudentId(1), march()).unwrap();
        assert_eq!(weeks.len(), 5);
        assert_eq!(weeks[0].credit.days, Decimal::ZERO);
        assert_eq!(weeks[1].window.start(), date(4));
        assert_eq!(weeks[1].credit.days, dec!(4.5));
        let total: Decimal = weeks.iter().map(|week| week.credit.days).sum();
        assert_eq!(total, dec!(4.5));
    }

    #[test]
    fn academic_year_clips_the_month() {
        let ctx = populated();
        let year = AcademicYear::new(date(6), NaiveDate::from_ymd_opt(2025, 3, 31).unwrap())
            .unwrap();
        let credit =
            PayrollService::credited_days_in(&ctx, StudentId(1), march(), &year).unwrap();
        assert_eq!(credit.days, dec!(2.5));
    }

    #[test]
    fn summarize_is_deterministic() {
        let ctx = populated();
        let students = [StudentId(1), StudentId(2)];
        let first =
            PayrollService::summarize(&ctx, &students, march(), dec!(10), FareType::OneWay)
                .unwrap();
        let second =
            PayrollService::summarize(&ctx, &students, march(), dec!(10), FareType::OneWay)
                .unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].amount, dec!(45));
        assert_eq!(first[1].amount, Decimal::ZERO);
    }
}
