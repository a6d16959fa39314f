//! SQL dialect definitions and formatting rules.
//!
//! This module provides a trait-based abstraction for SQL dialect
//! differences. Each dialect implements `SqlDialect` to handle its
//! specific syntax:
//!
//! - Identifier quoting: `"` (DuckDB/Postgres), `` ` `` (BigQuery)
//! - Date literals and date arithmetic (truncation, granule stepping)
//! - CTE syntax (RECURSIVE keyword)
//!
//! The date functions matter most here: cumulative-metric expansion
//! generates calendar truncation and one-granule stepping, and those
//! are spelled differently by every engine.

mod bigquery;
mod duckdb;
pub mod helpers;
mod postgres;

pub use bigquery::BigQuery;
pub use duckdb::DuckDb;
pub use postgres::Postgres;

use crate::mdl::TimeUnit;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// Default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// All supported dialects use single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    /// Format a date literal from an ISO `YYYY-MM-DD` string.
    fn format_date_literal(&self, date: &str) -> String {
        format!("DATE '{}'", date)
    }

    /// Whether to emit the RECURSIVE keyword for recursive CTEs.
    fn emit_recursive_keyword(&self) -> bool {
        true
    }

    /// Truncate a date expression to the start of the given unit.
    fn date_trunc(&self, unit: TimeUnit, expr: &str) -> String {
        format!("DATE_TRUNC('{}', {})", unit.as_str(), expr)
    }

    /// Advance a date expression by exactly one granule of the unit.
    fn date_step(&self, unit: TimeUnit, expr: &str) -> String;
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    DuckDb,
    Postgres,
    BigQuery,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::DuckDb => &DuckDb,
            Dialect::Postgres => &Postgres,
            Dialect::BigQuery => &BigQuery,
        }
    }
}

// Implement SqlDialect for the enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_date_literal(&self, date: &str) -> String {
        self.dialect().format_date_literal(date)
    }

    fn emit_recursive_keyword(&self) -> bool {
        self.dialect().emit_recursive_keyword()
    }

    fn date_trunc(&self, unit: TimeUnit, expr: &str) -> String {
        self.dialect().date_trunc(unit, expr)
    }

    fn date_step(&self, unit: TimeUnit, expr: &str) -> String {
        self.dialect().date_step(unit, expr)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
