use attendance_core::domain::{
    business_days, group_into_weeks, AcademicYear, WeekSplit, YearMonth,
};
use chrono::{Datelike, NaiveDate, Weekday};

#[test]
fn business_days_cover_every_weekday_once() {
    for (year, month) in [(2024, 2), (2024, 3), (2024, 6), (2025, 11), (2026, 8)] {
        let ym = YearMonth::new(year, month).unwrap();
        let days = business_days(ym);
        let expected: Vec<NaiveDate> = ym
            .days()
            .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
            .collect();
        assert_eq!(days, expected, "{ym}");
    }
}

#[test]
fn weeks_partition_the_business_days() {
    let ym = YearMonth::new(2024, 6).unwrap();
    let days = business_days(ym);
    for split in [WeekSplit::MondayStart, WeekSplit::IsoWeek] {
        let weeks = group_into_weeks(&days, split);
        let flattened: Vec<NaiveDate> =
            weeks.iter().flat_map(|week| week.days().iter().copied()).collect();
        assert_eq!(flattened, days);
        assert!(weeks.iter().all(|week| !week.is_empty() && week.len() <= 5));
    }
}

#[test]
fn invalid_month_selection_is_rejected() {
    assert!(YearMonth::new(2024, 0).is_err());
    assert!(YearMonth::new(2024, 13).is_err());
}

#[test]
fn academic_year_spans_calendar_years() {
    let year = AcademicYear::new(
        NaiveDate::from_ymd_opt(2024, 8, 19).unwrap(),
        NaiveDate::from_ymd_opt(2025, 5, 30).unwrap(),
    )
    .unwrap();
    let months = year.months();
    assert_eq!(months.len(), 10);
    assert_eq!(months.first().copied(), YearMonth::new(2024, 8).ok());
    assert_eq!(months.last().copied(), YearMonth::new(2025, 5).ok());
    let august = year.business_days(YearMonth::new(2024, 8).unwrap());
    assert_eq!(august.first().copied(), NaiveDate::from_ymd_opt(2024, 8, 19));
}
