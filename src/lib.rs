//! # Strata
//!
//! A semantic layer query compiler: SQL written against business-defined
//! models, metrics, and cumulative metrics is rewritten into plain SQL a
//! physical engine can run.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              Manifest (Semantic Schema)                  │
//! │  (models, metrics, cumulative metrics, relationships)   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [AnalyzedMdl]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Relation Analysis (lineage + join criteria)      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [rule pipeline]
//! ┌─────────────────────────────────────────────────────────┐
//! │     Expansion (one CTE per semantic reference)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [emitter + dialect]
//! ┌─────────────────────────────────────────────────────────┐
//! │                  Physical SQL                           │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use strata::mdl::{AnalyzedMdl, Column, Manifest, Model};
//! use strata::rewrite::{rewrite, SemanticCteRewrite, SessionContext};
//!
//! let manifest = Manifest::builder()
//!     .catalog("accio")
//!     .schema("test")
//!     .model(Model::new(
//!         "Orders",
//!         "SELECT * FROM tpch.orders",
//!         vec![Column::new("orderkey", "INTEGER")],
//!     ))
//!     .build()?;
//! let mdl = AnalyzedMdl::new(manifest);
//! let ctx = SessionContext::new("accio", "test");
//! let sql = rewrite("SELECT * FROM Orders", &ctx, &mdl, &[&SemanticCteRewrite])?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod mdl;
pub mod rewrite;
pub mod sql;

pub use mdl::{AnalyzedMdl, Manifest, ManifestBuilder};
pub use rewrite::{rewrite, RewriteError, RewriteRule, SemanticCteRewrite, SessionContext};
pub use sql::Dialect;
