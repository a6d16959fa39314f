//! Cumulative metric definitions - time-windowed running aggregates.

use super::types::TimeUnit;
use serde::{Deserialize, Serialize};

/// A cumulative metric: one measure aggregated per time granule over
/// a fixed window, driven by the manifest's date spine.
///
/// Expands to exactly two output columns: the window name (granule
/// start date) and the measure name (aggregate value).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeMetric {
    pub name: String,
    pub base_object: String,
    pub measure: Measure,
    pub window: Window,
}

impl CumulativeMetric {
    pub fn new(name: &str, base_object: &str, measure: Measure, window: Window) -> Self {
        Self {
            name: name.into(),
            base_object: base_object.into(),
            measure,
            window,
        }
    }
}

/// The aggregated value of a cumulative metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Aggregation operator: `sum`, `count`, `avg`, `min`, `max`.
    pub operator: String,
    /// Source expression over the base relation's columns.
    pub ref_column: String,
}

impl Measure {
    pub fn new(name: &str, type_name: &str, operator: &str, ref_column: &str) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            operator: operator.into(),
            ref_column: ref_column.into(),
        }
    }
}

/// The time window of a cumulative metric.
///
/// `ref_column` must resolve to a date/timestamp column on the base
/// relation; `start`/`end` bound the granules inclusively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub name: String,
    pub ref_column: String,
    pub time_unit: TimeUnit,
    /// Inclusive ISO date, e.g. `1994-01-01`.
    pub start: String,
    /// Inclusive ISO date.
    pub end: String,
}

impl Window {
    pub fn new(name: &str, ref_column: &str, time_unit: TimeUnit, start: &str, end: &str) -> Self {
        Self {
            name: name.into(),
            ref_column: ref_column.into(),
            time_unit,
            start: start.into(),
            end: end.into(),
        }
    }
}
