//! Date spine definition - the generated calendar relation.

use super::types::TimeUnit;
use serde::{Deserialize, Serialize};

/// Default spine column name when the manifest does not set one.
pub const DEFAULT_SPINE_COLUMN: &str = "date_day";

/// The manifest's generated calendar: one row per `unit` granule
/// between `start` and `end` inclusive.
///
/// Cumulative metric expansion materializes this as a recursive CTE
/// and derives each window's granules from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSpine {
    pub unit: TimeUnit,
    /// Inclusive ISO date.
    pub start: String,
    /// Inclusive ISO date.
    pub end: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
}

impl DateSpine {
    pub fn new(unit: TimeUnit, start: &str, end: &str) -> Self {
        Self {
            unit,
            start: start.into(),
            end: end.into(),
            column_name: None,
        }
    }

    pub fn with_column_name(mut self, column_name: &str) -> Self {
        self.column_name = Some(column_name.into());
        self
    }

    /// The spine's output column name.
    pub fn column(&self) -> &str {
        self.column_name.as_deref().unwrap_or(DEFAULT_SPINE_COLUMN)
    }
}
