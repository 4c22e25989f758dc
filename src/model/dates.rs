//! Calendar date parsing and the month arithmetic used by budgets and goal insights.

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};

/// Dates are stored and exchanged as `YYYY-MM-DD`, which sorts lexicographically.
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` date supplied by a caller. `field` names the argument in the error
/// message.
pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        Error::validation(format!(
            "{field} must be a date formatted as YYYY-MM-DD, got '{value}': {e}"
        ))
    })
}

/// Parses an optional date argument. Blank strings are treated as absent.
pub(crate) fn parse_optional_date(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_date(field, s).map(Some),
    }
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Counts whole calendar-month differences between two dates, ignoring the day of the month.
/// A span from Jan 31 to Feb 1 is one month. The result is negative when `end` is in an earlier
/// month than `start`.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let years = i64::from(end.year()) - i64::from(start.year());
    let months = i64::from(end.month()) - i64::from(start.month());
    years * 12 + months
}

/// Returns the half-open range `[YYYY-MM-01, next-month-01)` for a calendar month. December rolls
/// over into January of the following year.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    if !(1..=12).contains(&month) {
        return Err(Error::validation(format!(
            "month must be between 1 and 12, got {month}"
        )));
    }
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1), 1)
    } else {
        (Some(year), month + 1)
    };
    let start = NaiveDate::from_ymd_opt(year, month, 1);
    let end = next_year.and_then(|y| NaiveDate::from_ymd_opt(y, next_month, 1));
    match (start, end) {
        (Some(start), Some(end)) => Ok((start, end)),
        _ => Err(Error::validation(format!("year {year} is out of range"))),
    }
}

/// An inclusive date range where either bound may be open.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

impl DateRange {
    /// Validates that `start` does not come after `end` when both are present.
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(Error::validation(format!(
                    "start_date {} must not be after end_date {}",
                    format_date(s),
                    format_date(e)
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Parses optional `start_date` and `end_date` arguments.
    pub(crate) fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        Self::new(
            parse_optional_date("start_date", start)?,
            parse_optional_date("end_date", end)?,
        )
    }

    /// An unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }
}
