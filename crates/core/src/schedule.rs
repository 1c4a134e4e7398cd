//! Installment due-date scheduling.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::holidays::HolidayCalendar;

/// Spacing between consecutive installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "days")]
pub enum Interval {
    /// Same day of month; clamped to the last day in shorter months.
    #[default]
    Monthly,
    /// Fixed stride of calendar days.
    EveryDays(u32),
}

/// Compute the due dates of `count` installments.
///
/// Index `i` falls on `start + i months` or `start + i * n days`. With
/// `skip_non_business_days`, each date is moved forward one day at a time
/// until it is neither a weekend day nor in `calendar`.
#[must_use]
pub fn schedule_due_dates(
    start: NaiveDate,
    count: u32,
    interval: Interval,
    skip_non_business_days: bool,
    calendar: &HolidayCalendar,
) -> Vec<NaiveDate> {
    (0..count)
        .map(|i| {
            let due = nominal_due_date(start, i, interval);
            if skip_non_business_days {
                next_business_day(due, calendar)
            } else {
                due
            }
        })
        .collect()
}

fn nominal_due_date(start: NaiveDate, index: u32, interval: Interval) -> NaiveDate {
    let shifted = match interval {
        Interval::Monthly => start.checked_add_months(Months::new(index)),
        Interval::EveryDays(days) => {
            start.checked_add_days(Days::new(u64::from(index) * u64::from(days)))
        }
    };
    shifted.unwrap_or(NaiveDate::MAX)
}

/// First business day on or after `date`.
#[must_use]
pub fn next_business_day(date: NaiveDate, calendar: &HolidayCalendar) -> NaiveDate {
    let mut current = date;
    while !calendar.is_business_day(current) {
        match current.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Weekday};
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_without_skipping() {
        // 2025-01-06 is a Monday
        let dates = schedule_due_dates(
            date(2025, 1, 6),
            3,
            Interval::Monthly,
            false,
            &HolidayCalendar::none(),
        );
        assert_eq!(
            dates,
            vec![date(2025, 1, 6), date(2025, 2, 6), date(2025, 3, 6)]
        );
    }

    #[test]
    fn test_monthly_clamps_to_month_end() {
        let dates = schedule_due_dates(
            date(2025, 1, 31),
            3,
            Interval::Monthly,
            false,
            &HolidayCalendar::none(),
        );
        assert_eq!(
            dates,
            vec![date(2025, 1, 31), date(2025, 2, 28), date(2025, 3, 31)]
        );
    }

    #[test]
    fn test_every_days_stride() {
        let dates = schedule_due_dates(
            date(2025, 1, 6),
            3,
            Interval::EveryDays(15),
            false,
            &HolidayCalendar::none(),
        );
        assert_eq!(
            dates,
            vec![date(2025, 1, 6), date(2025, 1, 21), date(2025, 2, 5)]
        );
    }

    #[test]
    fn test_skip_weekend_only() {
        // 2025-03-08 is a Saturday
        let dates = schedule_due_dates(
            date(2025, 3, 8),
            2,
            Interval::Monthly,
            true,
            &HolidayCalendar::none(),
        );
        // 2025-04-08 is a Tuesday
        assert_eq!(dates, vec![date(2025, 3, 10), date(2025, 4, 8)]);
    }

    #[test]
    fn test_skip_holiday_then_weekend() {
        // Good Friday 2025-04-18 -> Saturday, Sunday -> Monday 21 is Tiradentes -> Tuesday 22
        let calendar = HolidayCalendar::brazil(2025..=2025);
        assert_eq!(next_business_day(date(2025, 4, 18), &calendar), date(2025, 4, 22));
    }

    #[test]
    fn test_zero_count_is_empty() {
        let dates = schedule_due_dates(
            date(2025, 1, 1),
            0,
            Interval::Monthly,
            true,
            &HolidayCalendar::none(),
        );
        assert!(dates.is_empty());
    }

    fn arb_interval() -> impl Strategy<Value = Interval> {
        prop_oneof![
            Just(Interval::Monthly),
            (1u32..=60).prop_map(Interval::EveryDays),
        ]
    }

    proptest! {
        #[test]
        fn prop_count_and_order(
            offset in 0i64..20_000,
            count in 2u32..=120,
            interval in arb_interval(),
            skip in any::<bool>(),
        ) {
            let start = date(2000, 1, 1) + chrono::Duration::days(offset);
            let calendar = HolidayCalendar::brazil(2000..=2070);
            let dates = schedule_due_dates(start, count, interval, skip, &calendar);

            prop_assert_eq!(dates.len(), count as usize);
            prop_assert!(dates.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn prop_skipping_never_lands_on_weekend(
            offset in 0i64..20_000,
            count in 2u32..=60,
            interval in arb_interval(),
        ) {
            let start = date(2000, 1, 1) + chrono::Duration::days(offset);
            let calendar = HolidayCalendar::brazil(2000..=2070);
            let dates = schedule_due_dates(start, count, interval, true, &calendar);

            for due in dates {
                prop_assert!(!matches!(due.weekday(), Weekday::Sat | Weekday::Sun));
                prop_assert!(!calendar.contains(due));
            }
        }
    }
}
