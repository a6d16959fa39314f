//! Manifest - the immutable semantic schema.

use super::cumulative::CumulativeMetric;
use super::metric::Metric;
use super::model::Model;
use super::relationship::Relationship;
use super::spine::DateSpine;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while building a manifest.
///
/// Structural problems fail here, at construction, never at
/// rewrite time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MdlError {
    #[error("duplicate entity name in manifest: {0}")]
    DuplicateEntity(String),

    #[error("duplicate column {column} in {entity}")]
    DuplicateColumn { entity: String, column: String },
}

/// A named SQL view over semantic names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub name: String,
    pub statement: String,
}

impl View {
    pub fn new(name: &str, statement: &str) -> Self {
        Self {
            name: name.into(),
            statement: statement.into(),
        }
    }
}

/// The semantic schema: models, metrics, cumulative metrics,
/// relationships, and views under one catalog/schema pair.
///
/// Immutable after construction. To derive a variant, use
/// [`Manifest::to_builder`] - the original is never touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub catalog: String,
    pub schema: String,
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub cumulative_metrics: Vec<CumulativeMetric>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_spine: Option<DateSpine>,
}

impl Manifest {
    pub fn builder() -> ManifestBuilder {
        ManifestBuilder::default()
    }

    /// Start a builder seeded from this manifest. Collections can be
    /// replaced wholesale; `build()` yields a new manifest.
    pub fn to_builder(&self) -> ManifestBuilder {
        ManifestBuilder {
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            models: self.models.clone(),
            metrics: self.metrics.clone(),
            cumulative_metrics: self.cumulative_metrics.clone(),
            relationships: self.relationships.clone(),
            views: self.views.clone(),
            date_spine: self.date_spine.clone(),
        }
    }
}

/// Builder for [`Manifest`]. Validates name uniqueness on `build()`.
#[derive(Debug, Clone, Default)]
#[must_use = "builders have no effect until build() is called"]
pub struct ManifestBuilder {
    catalog: String,
    schema: String,
    models: Vec<Model>,
    metrics: Vec<Metric>,
    cumulative_metrics: Vec<CumulativeMetric>,
    relationships: Vec<Relationship>,
    views: Vec<View>,
    date_spine: Option<DateSpine>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(mut self, catalog: &str) -> Self {
        self.catalog = catalog.into();
        self
    }

    pub fn schema(mut self, schema: &str) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn model(mut self, model: Model) -> Self {
        self.models.push(model);
        self
    }

    /// Replace the model collection.
    pub fn models(mut self, models: Vec<Model>) -> Self {
        self.models = models;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    /// Replace the metric collection.
    pub fn metrics(mut self, metrics: Vec<Metric>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn cumulative_metric(mut self, metric: CumulativeMetric) -> Self {
        self.cumulative_metrics.push(metric);
        self
    }

    /// Replace the cumulative metric collection.
    pub fn cumulative_metrics(mut self, metrics: Vec<CumulativeMetric>) -> Self {
        self.cumulative_metrics = metrics;
        self
    }

    pub fn relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    pub fn date_spine(mut self, spine: DateSpine) -> Self {
        self.date_spine = Some(spine);
        self
    }

    /// Validate and build the manifest.
    pub fn build(self) -> Result<Manifest, MdlError> {
        let mut entity_names = HashSet::new();
        let all_names = self
            .models
            .iter()
            .map(|m| m.name.as_str())
            .chain(self.metrics.iter().map(|m| m.name.as_str()))
            .chain(self.cumulative_metrics.iter().map(|m| m.name.as_str()))
            .chain(self.views.iter().map(|v| v.name.as_str()));
        for name in all_names {
            if !entity_names.insert(name) {
                return Err(MdlError::DuplicateEntity(name.into()));
            }
        }

        for model in &self.models {
            let mut column_names = HashSet::new();
            for column in &model.columns {
                if !column_names.insert(column.name.as_str()) {
                    return Err(MdlError::DuplicateColumn {
                        entity: model.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }

        for metric in &self.metrics {
            let mut column_names = HashSet::new();
            for column in metric.output_columns() {
                if !column_names.insert(column.name.as_str()) {
                    return Err(MdlError::DuplicateColumn {
                        entity: metric.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }

        Ok(Manifest {
            catalog: self.catalog,
            schema: self.schema,
            models: self.models,
            metrics: self.metrics,
            cumulative_metrics: self.cumulative_metrics,
            relationships: self.relationships,
            views: self.views,
            date_spine: self.date_spine,
        })
    }
}
