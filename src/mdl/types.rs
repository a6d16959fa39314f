//! Shared semantic type utilities.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Time granularity for date spines and cumulative windows.
///
/// Ordered by coarseness: `Day < Week < Month < Quarter < Year`.
/// A window's unit must be the same as or coarser than the spine's
/// granularity, which is exactly the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeUnit {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeUnit {
    /// Lowercase unit name as used in `date_trunc` calls.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Quarter => "quarter",
            TimeUnit::Year => "year",
        }
    }

    /// Truncate a date to the start of its granule.
    ///
    /// Weeks start on Monday (ISO convention).
    pub fn truncate(&self, date: NaiveDate) -> NaiveDate {
        match self {
            TimeUnit::Day => date,
            TimeUnit::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            TimeUnit::Month => first_day(date.year(), date.month()),
            TimeUnit::Quarter => {
                let quarter_month = ((date.month() - 1) / 3) * 3 + 1;
                first_day(date.year(), quarter_month)
            }
            TimeUnit::Year => first_day(date.year(), 1),
        }
    }

    /// Count the distinct granules touched by the inclusive range
    /// `[start, end]`.
    ///
    /// For example `[1994-01-01, 1994-12-31]` touches 365 days,
    /// 53 ISO weeks, and 12 months.
    pub fn periods_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return 0;
        }
        match self {
            TimeUnit::Day => (end - start).num_days() + 1,
            TimeUnit::Week => {
                let start_week = self.truncate(start);
                let end_week = self.truncate(end);
                (end_week - start_week).num_days() / 7 + 1
            }
            TimeUnit::Month => {
                let months = (end.year() as i64 - start.year() as i64) * 12
                    + (end.month() as i64 - start.month() as i64);
                months + 1
            }
            TimeUnit::Quarter => {
                let start_q = (start.month() as i64 - 1) / 3;
                let end_q = (end.month() as i64 - 1) / 3;
                (end.year() as i64 - start.year() as i64) * 4 + (end_q - start_q) + 1
            }
            TimeUnit::Year => end.year() as i64 - start.year() as i64 + 1,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn first_day(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

/// Whether a semantic column type is a date or timestamp type.
///
/// Matches `DATE`, `TIMESTAMP`, and parameterized forms like
/// `TIMESTAMP(3)` or `TIMESTAMP WITH TIME ZONE`, case-insensitively.
pub fn is_temporal_type(type_name: &str) -> bool {
    let upper = type_name.trim().to_uppercase();
    upper == "DATE" || upper.starts_with("TIMESTAMP")
}
