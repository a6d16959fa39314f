//! DuckDB SQL dialect.
//!
//! DuckDB is PostgreSQL-compatible with extensions:
//! - ANSI identifier quoting (`"`)
//! - Unquoted INTERVAL syntax (`INTERVAL 1 WEEK`)
//! - `DATE_TRUNC` with ISO weeks starting Monday

use super::helpers;
use super::SqlDialect;
use crate::mdl::TimeUnit;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    // Uses default date_trunc (DATE_TRUNC('unit', expr))

    fn date_step(&self, unit: TimeUnit, expr: &str) -> String {
        // DuckDB has no QUARTER interval keyword; step three months.
        match unit {
            TimeUnit::Quarter => format!("({} + INTERVAL 3 MONTH)", expr),
            _ => format!("({} + INTERVAL 1 {})", expr, unit.as_str().to_uppercase()),
        }
    }
}
