//! The generalized join.
//!
//! A merge pairs the rows of two record sequences and decides, for every matched pair and
//! every row present on one side only, what to emit:
//!
//! - [`selectors`] turns field-equality pairs into per-side key functions
//! - [`method`] is the `"<onMatched> <onUnmatched>"` keyword grammar and the [`Combiner`]
//! - [`engine`] runs the hash-bucket join lazily
//!
//! ```rust
//! use fluent_dataset::merge::{merge_records, KeySelectors, Matcher, MergeOptions};
//! use serde_json::json;
//!
//! let left = vec![json!({"id": 1, "a": "x"})];
//! let right = vec![json!({"id": 1, "b": "y"}), json!({"id": 2, "b": "z"})];
//!
//! let rows = merge_records(
//!     left,
//!     right,
//!     Matcher::On(KeySelectors::same(["id"])),
//!     MergeOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(rows, vec![json!({"id": 1, "a": "x", "b": "y"})]);
//! ```

pub mod engine;
pub mod method;
pub mod selectors;

pub use engine::{merge_records, Matcher, MergeOptions, MergePlan, RecordMapper};
pub use method::{CombineFn, Combiner, MergeMethod, MergeToken};
pub use selectors::{equality_to_key_selectors, value_at_path, FieldPair, KeyFn, KeySelectors};
