//! Model definitions - virtual tables over physical data.

use serde::{Deserialize, Serialize};

/// A model: a virtual table defined by a base SQL statement or a
/// reference to another semantic object, exposing a fixed column list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub name: String,
    /// Base SQL statement over physical tables. Exactly one of
    /// `ref_sql` / `base_object` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_sql: Option<String>,
    /// Reference to another model, metric, or cumulative metric.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_object: Option<String>,
    pub columns: Vec<Column>,
}

impl Model {
    /// Model over a raw SQL statement.
    pub fn new(name: &str, ref_sql: &str, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            ref_sql: Some(ref_sql.into()),
            base_object: None,
            columns,
        }
    }

    /// Model layered on another semantic object.
    pub fn on_base_object(name: &str, base_object: &str, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            ref_sql: None,
            base_object: Some(base_object.into()),
            columns,
        }
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Columns that appear in the model's projection (not hidden).
    pub fn visible_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| !c.is_hidden)
    }
}

/// A column of a model, metric dimension, or metric measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Calculated expression; identity projection when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Relationship this column participates in, by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default)]
    pub is_hidden: bool,
}

impl Column {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            expression: None,
            relationship: None,
            is_hidden: false,
        }
    }

    /// Column computed from an expression over the base relation.
    pub fn calculated(name: &str, type_name: &str, expression: &str) -> Self {
        Self {
            expression: Some(expression.into()),
            ..Self::new(name, type_name)
        }
    }

    pub fn with_relationship(mut self, relationship: &str) -> Self {
        self.relationship = Some(relationship.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    /// The SQL expression this column projects: its calculated
    /// expression, or the column name itself.
    pub fn sql_expression(&self) -> &str {
        self.expression.as_deref().unwrap_or(&self.name)
    }
}
