//! `fluent-dataset` is a small, lazily evaluated engine for relational-style queries over
//! in-memory records.
//!
//! The primary entrypoint is [`Dataset`], a fluent pipeline (`map`, `filter`, `sort`,
//! `group`, `ungroup`, `reduce`, `distinct`, `merge`) over records that may be nested in
//! groups to any depth. Operations always apply at the base level, so the same call works on
//! a flat list or on groups of groups, and the dataset tracks the nesting depth itself.
//!
//! ## What a record is
//!
//! Records are [`serde_json::Value`]s, normally objects. They are only ever looked at
//! through caller-supplied functions (predicates, key functions, comparators, combiners)
//! and through dot-path field selectors such as `user.name`.
//!
//! ## Quick example: group and aggregate
//!
//! ```rust
//! use fluent_dataset::{Aggregate, Dataset};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), fluent_dataset::DatasetError> {
//! let mut ds = Dataset::new(vec![
//!     json!({"team": "red", "pts": 3}),
//!     json!({"team": "blue", "pts": 1}),
//!     json!({"team": "red", "pts": 4}),
//! ]);
//! ds.group(|r| r["team"].clone())
//!     .reduce(Aggregate::new().first("team", "team").sum("pts", "pts"))?;
//!
//! assert_eq!(
//!     ds.get()?,
//!     json!([{"team": "red", "pts": 7}, {"team": "blue", "pts": 1}])
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Quick example: merge
//!
//! A merge matches rows by key and combines them with a `"<onMatched> <onUnmatched>"`
//! keyword method. The default, `"both null"`, is an inner join where left fields win.
//!
//! ```rust
//! use fluent_dataset::{Dataset, KeySelectors, MergeOptions};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), fluent_dataset::DatasetError> {
//! let mut users = Dataset::new(vec![json!({"id": 1, "name": "ada"}), json!({"id": 3, "name": "cy"})]);
//! let orders = Dataset::new(vec![json!({"id": 1, "total": 9}), json!({"id": 2, "total": 4})]);
//!
//! users.merge(orders, KeySelectors::same(["id"]), MergeOptions::keywords("both left")?)?;
//! assert_eq!(
//!     users.get()?,
//!     json!([{"id": 1, "name": "ada", "total": 9}, {"id": 3, "name": "cy"}])
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! Attach a [`PipelineObserver`] through [`PipelineOptions`] (or [`Dataset::observe`]) to
//! receive [`PipelineEvent`]s. [`PipelineMetrics`] is an observer that keeps counters;
//! [`StdErrPipelineObserver`] prints events. The same events are also written to the `log`
//! facade at `trace` level.

pub mod dataset;
pub mod error;
pub mod ingestion;
pub mod merge;
pub mod observer;
pub mod processing;
pub mod types;

pub use dataset::{Dataset, PipelineOptions};
pub use error::{DatasetError, DatasetResult};
pub use ingestion::{read_records, read_schema, IngestionFormat, IngestionOptions};
pub use merge::{Combiner, KeySelectors, Matcher, MergeMethod, MergeOptions, MergeToken};
pub use observer::{
    CompositePipelineObserver, MergeStats, PipelineEvent, PipelineMetrics, PipelineMetricsSnapshot, PipelineObserver,
    PipelineOp, StdErrPipelineObserver,
};
pub use processing::{Aggregate, ReduceOp, Reducer, SortBy};
pub use types::{DataType, Field, Key, Node, Schema, Stream};
