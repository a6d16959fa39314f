//! Metric definitions - pre-aggregated rollups over a base object.

use super::model::Column;
use serde::{Deserialize, Serialize};

/// A metric: dimensions plus aggregate measures over a base object.
///
/// The base object may be a model, another metric, or a cumulative
/// metric; expansion resolves the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub name: String,
    pub base_object: String,
    /// Grouping columns. Expressions may reference base columns.
    pub dimension: Vec<Column>,
    /// Aggregate expressions (`sum(totalprice)` and the like).
    pub measure: Vec<Column>,
    /// Optional pre-declared time rollups of a date dimension.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub time_grain: Vec<TimeGrain>,
}

impl Metric {
    pub fn new(name: &str, base_object: &str, dimension: Vec<Column>, measure: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            base_object: base_object.into(),
            dimension,
            measure,
            time_grain: vec![],
        }
    }

    pub fn with_time_grain(mut self, time_grain: Vec<TimeGrain>) -> Self {
        self.time_grain = time_grain;
        self
    }

    /// All output columns, dimensions first then measures.
    pub fn output_columns(&self) -> impl Iterator<Item = &Column> {
        self.dimension.iter().chain(self.measure.iter())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.output_columns().find(|c| c.name == name)
    }
}

/// A declared time rollup: which date column a metric can be
/// grouped by, and at which date parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeGrain {
    pub name: String,
    pub ref_column: String,
    pub date_parts: Vec<String>,
}
