//! BigQuery (GoogleSQL) dialect.
//!
//! - Backtick identifier quoting
//! - `DATE_TRUNC(expr, UNIT)` argument order, weeks pinned to Monday
//! - `DATE_ADD(expr, INTERVAL n UNIT)` for date stepping

use super::helpers;
use super::SqlDialect;
use crate::mdl::TimeUnit;

/// BigQuery SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct BigQuery;

impl SqlDialect for BigQuery {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_backtick(ident)
    }

    fn date_trunc(&self, unit: TimeUnit, expr: &str) -> String {
        // ISO weeks (Monday start) to match the other engines.
        let part = match unit {
            TimeUnit::Day => "DAY",
            TimeUnit::Week => "WEEK(MONDAY)",
            TimeUnit::Month => "MONTH",
            TimeUnit::Quarter => "QUARTER",
            TimeUnit::Year => "YEAR",
        };
        format!("DATE_TRUNC({}, {})", expr, part)
    }

    fn date_step(&self, unit: TimeUnit, expr: &str) -> String {
        let part = match unit {
            TimeUnit::Day => "DAY",
            TimeUnit::Week => "WEEK",
            TimeUnit::Month => "MONTH",
            TimeUnit::Quarter => "QUARTER",
            TimeUnit::Year => "YEAR",
        };
        format!("DATE_ADD({}, INTERVAL 1 {})", expr, part)
    }
}
