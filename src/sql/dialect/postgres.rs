//! PostgreSQL dialect.
//!
//! The reference ANSI-ish dialect: double-quoted identifiers,
//! quoted interval strings, `DATE_TRUNC` with Monday-start weeks.

use super::helpers;
use super::SqlDialect;
use crate::mdl::TimeUnit;

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn date_step(&self, unit: TimeUnit, expr: &str) -> String {
        let interval = match unit {
            TimeUnit::Day => "1 day",
            TimeUnit::Week => "1 week",
            TimeUnit::Month => "1 month",
            TimeUnit::Quarter => "3 months",
            TimeUnit::Year => "1 year",
        };
        format!("({} + INTERVAL '{}')", expr, interval)
    }
}
