//! Base-level pipeline operations and the machinery that drives them.
//!
//! Every operation here is an [`Operation`]: a stream-to-stream transform over one base
//! sequence. [`recurse`] applies it at the right depth of nested data, so the same `map`
//! works on a flat list of records or on groups of groups.
//!
//! Currently implemented:
//!
//! - [`map()`], [`filter()`], [`sort()`]: order-preserving (or stable) per-group transforms
//! - [`group()`], [`distinct()`]: bucketing through a [`KeyedBucketStore`]
//! - [`reduce()`]: fold a group with a [`Reducer`] (custom fold or built-in [`Aggregate`])
//!
//! ## Example: group then reduce, driven directly
//!
//! ```rust
//! use fluent_dataset::processing::{group, materialize, recurse, reduce, Aggregate};
//! use fluent_dataset::types::Node;
//! use serde_json::json;
//!
//! let data = Node::records(vec![
//!     json!({"team": "a", "pts": 3}),
//!     json!({"team": "b", "pts": 1}),
//!     json!({"team": "a", "pts": 4}),
//! ]);
//!
//! let grouped = recurse(&group(|r| r["team"].clone()), data, 1);
//! let totals = recurse(&reduce(Aggregate::new().sum("pts", "pts").into()), grouped, 2);
//! assert_eq!(materialize(totals, 2).unwrap(), json!([[{"pts": 7}], [{"pts": 1}]]));
//! ```

pub mod buckets;
pub mod filter;
pub mod group;
pub mod map;
pub mod recursion;
pub mod reduce;
pub mod sort;

pub use buckets::{CrossMapRow, KeyedBucketStore};
pub use filter::filter;
pub use group::{distinct, group};
pub use map::map;
pub use recursion::{materialize, recurse, recurse_to_value, Operation};
pub use reduce::{reduce, reduce_field, Aggregate, AggregateColumn, ReduceOp, Reducer};
pub use sort::{compare_values, sort, SortBy};
