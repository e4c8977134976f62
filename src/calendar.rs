//! ISO-week helpers shared by the vaccination and weekly-rate tables.
//!
//! Both tables are keyed by the Thursday of an ISO week, the "midweek" anchor.
//! Daily data carries its own ascending week index that keeps counting across
//! year boundaries, so week 31 of 2021 and week 31 of 2022 never collide.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An ISO year-week such as `2021-W05`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearWeek {
    pub year: i32,
    pub week: u32,
}

impl YearWeek {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        YearWeek {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Thursday of this ISO week, or `None` for a week the year does not have.
    pub fn thursday(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Thu)
    }
}

impl fmt::Display for YearWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseYearWeekError(String);

impl fmt::Display for ParseYearWeekError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid ISO year-week '{}'", self.0)
    }
}

impl std::error::Error for ParseYearWeekError {}

impl FromStr for YearWeek {
    type Err = ParseYearWeekError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseYearWeekError(s.to_string());
        let (year, week) = s.trim().split_once("-W").ok_or_else(err)?;
        let yw = YearWeek {
            year: year.parse().map_err(|_| err())?,
            week: week.parse().map_err(|_| err())?,
        };
        // rejects week 0 and week 53 in 52-week years
        yw.thursday().ok_or_else(err)?;
        Ok(yw)
    }
}

impl Serialize for YearWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Assigns each date an ascending week index starting at 1.
///
/// `dates` must be sorted. The index grows by exactly one every time the ISO
/// week changes between consecutive dates and is never reset by the calendar year.
pub fn ascending_week_indices(dates: &[NaiveDate]) -> Vec<u32> {
    let mut indices = Vec::with_capacity(dates.len());
    let mut current = 0u32;
    let mut previous: Option<YearWeek> = None;

    for &date in dates {
        let week = YearWeek::of(date);
        if previous != Some(week) {
            current += 1;
            previous = Some(week);
        }
        indices.push(current);
    }

    indices
}

/// Thursday date for an ascending week index, counted from the week holding `first_date`.
pub fn midweek_for_index(first_date: NaiveDate, week_index: u32) -> NaiveDate {
    let offset = first_date.weekday().num_days_from_monday() as i64;
    let first_thursday = first_date - Duration::days(offset) + Duration::days(3);
    first_thursday + Duration::days(7 * (i64::from(week_index) - 1))
}
