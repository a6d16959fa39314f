//! Analyzed manifest - lookup indexes over an immutable manifest.

use super::cumulative::CumulativeMetric;
use super::manifest::{Manifest, View};
use super::metric::Metric;
use super::model::Model;
use super::relationship::Relationship;
use std::collections::HashMap;

/// A manifest with by-name indexes, built once and shared across
/// rewrites. Lookups return `Option`, never sentinel values.
#[derive(Debug, Clone)]
pub struct AnalyzedMdl {
    manifest: Manifest,
    model_index: HashMap<String, usize>,
    metric_index: HashMap<String, usize>,
    cumulative_index: HashMap<String, usize>,
    view_index: HashMap<String, usize>,
}

impl AnalyzedMdl {
    pub fn new(manifest: Manifest) -> Self {
        let model_index = index_by(&manifest.models, |m| &m.name);
        let metric_index = index_by(&manifest.metrics, |m| &m.name);
        let cumulative_index = index_by(&manifest.cumulative_metrics, |m| &m.name);
        let view_index = index_by(&manifest.views, |v| &v.name);
        Self {
            manifest,
            model_index,
            metric_index,
            cumulative_index,
            view_index,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.model_index.get(name).map(|&i| &self.manifest.models[i])
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metric_index.get(name).map(|&i| &self.manifest.metrics[i])
    }

    pub fn cumulative_metric(&self, name: &str) -> Option<&CumulativeMetric> {
        self.cumulative_index
            .get(name)
            .map(|&i| &self.manifest.cumulative_metrics[i])
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.view_index.get(name).map(|&i| &self.manifest.views[i])
    }

    /// Whether a name refers to any semantic object.
    pub fn is_semantic(&self, name: &str) -> bool {
        self.model_index.contains_key(name)
            || self.metric_index.contains_key(name)
            || self.cumulative_index.contains_key(name)
            || self.view_index.contains_key(name)
    }

    /// All relationships connecting the two given models, in either
    /// endpoint order.
    pub fn relationships_between(&self, left: &str, right: &str) -> Vec<&Relationship> {
        self.manifest
            .relationships
            .iter()
            .filter(|r| r.connects(left, right))
            .collect()
    }
}

fn index_by<T>(items: &[T], name: impl Fn(&T) -> &String) -> HashMap<String, usize> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (name(item).clone(), i))
        .collect()
}
