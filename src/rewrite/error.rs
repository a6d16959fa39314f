//! Rewrite pipeline errors.

use crate::mdl::TimeUnit;
use sqlparser::parser::ParserError;
use thiserror::Error;

/// Result type for rewrite operations.
pub type RewriteResult<T> = Result<T, RewriteError>;

/// Errors raised during analysis, expansion, or emission.
///
/// Any error fails the whole rewrite; no SQL is emitted and nothing
/// is retried internally.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// A name inside the MDL (a base object, relationship endpoint,
    /// or ref column) does not resolve. Unknown names in the query
    /// itself pass through as physical tables instead.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// An implicit join matched zero or multiple relationships.
    #[error("cannot resolve implicit join between {left} and {right}: {found} matching relationships")]
    AmbiguousImplicitJoin {
        left: String,
        right: String,
        found: usize,
    },

    /// A cumulative window's ref column is not date/timestamp typed.
    #[error("CumulativeMetric measure cannot be window as it is not date/timestamp type")]
    InvalidWindowRefColumn,

    /// A base-object chain revisits a name.
    #[error("reference cycle detected: {0}")]
    ReferenceCycle(String),

    /// A cumulative metric needs a date spine the manifest lacks.
    #[error("manifest has no date spine: cannot expand cumulative metric {0}")]
    MissingDateSpine(String),

    /// A window unit finer than the spine granularity.
    #[error("window unit {window} is finer than date spine granularity {spine}")]
    WindowTooFine { window: TimeUnit, spine: TimeUnit },

    /// A date string in a window or spine is not a valid ISO date.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Unknown aggregation operator on a cumulative measure.
    #[error("unknown aggregation operator: {0}")]
    UnknownOperator(String),

    #[error("SQL parse error: {0}")]
    SqlParse(#[from] ParserError),

    #[error("unsupported SQL construct: {0}")]
    Unsupported(String),
}
