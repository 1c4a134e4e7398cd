//! Holiday calendars for business-day adjustment.
//!
//! A calendar is a finite set of dates. The scheduler treats every date in
//! the set like a weekend day. An empty calendar degrades adjustment to
//! weekends only.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use chrono::{Datelike, Days, NaiveDate};
use serde::Deserialize;
use thiserror::Error;

/// First year in which Black Consciousness Day is a national holiday.
const BLACK_CONSCIOUSNESS_FROM: i32 = 2024;

/// Errors that can occur while loading a holiday file.
#[derive(Debug, Error)]
pub enum HolidayError {
    /// The file is not valid YAML or has the wrong shape.
    #[error("invalid holiday file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// One entry of a holiday file.
#[derive(Debug, Clone, Deserialize)]
pub struct HolidayEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HolidayFile {
    holidays: Vec<HolidayEntry>,
}

/// A set of non-business dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    /// An empty calendar: only weekends are skipped.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a calendar from explicit dates.
    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// Brazilian national holidays for every year in `years`.
    #[must_use]
    pub fn brazil(years: RangeInclusive<i32>) -> Self {
        let mut calendar = Self::none();
        for year in years {
            calendar.extend(brazil_national_holidays(year));
        }
        calendar
    }

    /// Parse a YAML holiday file.
    ///
    /// ```yaml
    /// holidays:
    ///   - date: 2025-03-04
    ///     name: Carnival
    ///   - date: 2025-06-19
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`HolidayError::Parse`] if the document is malformed.
    pub fn parse_yaml(source: &str) -> Result<Vec<HolidayEntry>, HolidayError> {
        let file: HolidayFile = serde_yaml::from_str(source)?;
        Ok(file.holidays)
    }

    /// Add more dates to the calendar.
    pub fn extend(&mut self, dates: impl IntoIterator<Item = NaiveDate>) {
        self.dates.extend(dates);
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether `date` is neither a weekend day nor a holiday.
    #[must_use]
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        date.weekday().number_from_monday() <= 5 && !self.contains(date)
    }
}

/// Easter Sunday for a Gregorian year (anonymous Gregorian algorithm).
#[must_use]
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;

    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}

/// National holidays observed in Brazil for one year.
#[must_use]
pub fn brazil_national_holidays(year: i32) -> Vec<NaiveDate> {
    let mut fixed = vec![
        (1, 1),   // Confraternização Universal
        (4, 21),  // Tiradentes
        (5, 1),   // Dia do Trabalhador
        (9, 7),   // Independência
        (10, 12), // Nossa Senhora Aparecida
        (11, 2),  // Finados
        (11, 15), // Proclamação da República
        (12, 25), // Natal
    ];
    if year >= BLACK_CONSCIOUSNESS_FROM {
        fixed.push((11, 20));
    }

    let mut dates: Vec<NaiveDate> = fixed
        .into_iter()
        .filter_map(|(month, day)| NaiveDate::from_ymd_opt(year, month, day))
        .collect();

    if let Some(good_friday) = easter_sunday(year).and_then(|e| e.checked_sub_days(Days::new(2))) {
        dates.push(good_friday);
    }

    dates.sort_unstable();
    dates
}
