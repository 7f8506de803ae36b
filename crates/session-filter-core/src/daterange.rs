use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FilterError;

/// Number of days stepped back by [`build_range`] when the caller has no preference.
pub const DEFAULT_DAY_COUNT: i64 = 7;

/// Largest day count [`build_range`] accepts, roughly a century.
pub const MAX_DAY_COUNT: i64 = 36_600;

/// An ascending, gap-free run of calendar dates, inclusive of both ends.
///
/// Deserialization rejects lists that are not consecutive days, so the
/// ordering holds for every value. May be empty when built from reversed bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<NaiveDate>", into = "Vec<NaiveDate>")]
pub struct DateRange(Vec<NaiveDate>);

impl TryFrom<Vec<NaiveDate>> for DateRange {
    type Error = FilterError;

    fn try_from(dates: Vec<NaiveDate>) -> Result<Self, Self::Error> {
        if let Some(pair) = dates.windows(2).find(|p| p[0].succ_opt() != Some(p[1])) {
            return Err(FilterError::InvalidData(format!(
                "date range is not consecutive: {} is followed by {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self(dates))
    }
}

impl From<DateRange> for Vec<NaiveDate> {
    fn from(range: DateRange) -> Self {
        range.0
    }
}

impl DateRange {
    pub fn first(&self) -> Option<NaiveDate> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.0.last().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first()
            .zip(self.last())
            .is_some_and(|(first, last)| first <= date && date <= last)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDate> {
        self.0.iter()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.0
    }

    /// Dates rendered as `YYYY-MM-DD`.
    pub fn to_date_strings(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect()
    }
}

impl<'a> IntoIterator for &'a DateRange {
    type Item = &'a NaiveDate;
    type IntoIter = std::slice::Iter<'a, NaiveDate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// First and last day of one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Signed whole-day difference `end - start`.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// The current calendar date in the given timezone.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Returns `day_count + 1` consecutive dates ending at `anchor`.
///
/// A `day_count` below zero or above [`MAX_DAY_COUNT`] is rejected with
/// [`FilterError::InvalidArgument`].
pub fn build_range(day_count: i64, anchor: NaiveDate) -> Result<DateRange, FilterError> {
    if day_count < 0 {
        return Err(FilterError::InvalidArgument(format!(
            "day count must be non-negative, got {day_count}"
        )));
    }
    if day_count > MAX_DAY_COUNT {
        return Err(FilterError::InvalidArgument(format!(
            "day count {day_count} exceeds the maximum of {MAX_DAY_COUNT}"
        )));
    }

    let start = anchor
        .checked_sub_days(Days::new(day_count as u64))
        .ok_or_else(|| {
            FilterError::InvalidArgument(format!(
                "{day_count} day(s) before {anchor} is out of range"
            ))
        })?;

    let dates: Vec<NaiveDate> = start.iter_days().take(day_count as usize + 1).collect();
    Ok(DateRange(dates))
}

/// Same as [`build_range`], anchored at today's date in `tz`.
pub fn build_range_today(day_count: i64, tz: Tz) -> Result<DateRange, FilterError> {
    build_range(day_count, today_in(tz))
}

/// Returns every date in the inclusive range [start, end].
/// Reversed bounds give an empty range.
pub fn build_range_from_bounds(start: NaiveDate, end: NaiveDate) -> Result<DateRange, FilterError> {
    let day_count = days_between(start, end);
    if day_count < 0 {
        debug!("start {start} is after end {end}, returning empty range");
        return Ok(DateRange::default());
    }
    build_range(day_count, end)
}

/// The range immediately preceding `current`.
///
/// The new range ends the day before `current` starts and begins
/// `current.len()` days before that end, so it holds one date more than
/// `current`.
pub fn previous_range(current: &DateRange) -> Result<DateRange, FilterError> {
    let first = current.first().ok_or_else(|| {
        FilterError::InvalidArgument("cannot step back from an empty date range".into())
    })?;

    let end = first.pred_opt().ok_or_else(|| {
        FilterError::InvalidArgument(format!("no date precedes {first}"))
    })?;
    let start = end
        .checked_sub_days(Days::new(current.len() as u64))
        .ok_or_else(|| {
            FilterError::InvalidArgument(format!(
                "{} day(s) before {end} is out of range",
                current.len()
            ))
        })?;

    build_range_from_bounds(start, end)
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

pub fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        // Only the final representable month has no successor.
        .unwrap_or(NaiveDate::MAX)
}

/// One bucket per calendar month spanned by [start, end], ascending.
pub fn month_buckets(start: NaiveDate, end: NaiveDate) -> Vec<MonthBucket> {
    let last = last_of_month(end);
    let mut buckets = Vec::new();
    let mut current = first_of_month(start);
    while current <= last {
        let month_end = last_of_month(current);
        buckets.push(MonthBucket {
            start: current,
            end: month_end,
        });
        match month_end.succ_opt() {
            Some(next) => current = next,
            None => break,
        }
    }
    buckets
}

/// Widens [start, end] to the Monday of `start`'s week and the Sunday of `end`'s week.
pub fn full_weeks(start: NaiveDate, end: NaiveDate) -> Result<(NaiveDate, NaiveDate), FilterError> {
    let monday = start
        .checked_sub_days(Days::new(u64::from(start.weekday().num_days_from_monday())))
        .ok_or_else(|| FilterError::InvalidArgument(format!("week of {start} is out of range")))?;
    let sunday = end
        .checked_add_days(Days::new(u64::from(6 - end.weekday().num_days_from_monday())))
        .ok_or_else(|| FilterError::InvalidArgument(format!("week of {end} is out of range")))?;
    Ok((monday, sunday))
}

/// Parses a `YYYY-MM-DD` date. Full timestamps (RFC 3339 or
/// `YYYY-MM-DD HH:MM:SS`) are accepted and truncated to their date.
pub fn parse_date(input: &str) -> Result<NaiveDate, FilterError> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.date_naive());
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S")
        .map(|ts| ts.date())
        .map_err(|e| FilterError::Parse {
            input: input.to_string(),
            reason: e.to_string(),
        })
}
