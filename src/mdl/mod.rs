//! MDL - the semantic schema the rewriter compiles against.
//!
//! A [`Manifest`] declares models (virtual tables), metrics
//! (pre-aggregated rollups), cumulative metrics (time-windowed
//! aggregates), relationships, views, and an optional date spine.
//! It is immutable once built; [`Manifest::to_builder`] derives
//! variants without touching the original. [`AnalyzedMdl`] wraps a
//! manifest with by-name indexes for the rewrite pipeline.

pub mod analyzed;
pub mod cumulative;
pub mod manifest;
pub mod metric;
pub mod model;
pub mod relationship;
pub mod spine;
pub mod types;

pub use analyzed::AnalyzedMdl;
pub use cumulative::{CumulativeMetric, Measure, Window};
pub use manifest::{Manifest, ManifestBuilder, MdlError, View};
pub use metric::{Metric, TimeGrain};
pub use model::{Column, Model};
pub use relationship::{JoinKind, Relationship};
pub use spine::{DateSpine, DEFAULT_SPINE_COLUMN};
pub use types::{is_temporal_type, TimeUnit};
