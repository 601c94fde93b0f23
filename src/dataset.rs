//! The fluent dataset controller.

use std::fmt;
use std::iter;
use std::mem;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{DatasetError, DatasetResult};
use crate::ingestion::{read_records, IngestionOptions};
use crate::merge::engine::{merge_streams, Matcher, MergeOptions, MergePlan};
use crate::observer::{EventSink, PipelineEvent, PipelineObserver, PipelineOp};
use crate::processing::recursion::{materialize, recurse, recurse_to_value, Operation};
use crate::processing::{distinct, filter, group, map, reduce, sort, Reducer, SortBy};
use crate::types::{Node, Stream};

/// Options for a [`Dataset`] pipeline.
///
/// Use [`Default`] for common cases.
#[derive(Clone, Default)]
pub struct PipelineOptions {
    /// Optional observer receiving every pipeline event.
    pub observer: Option<Arc<dyn PipelineObserver>>,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

/// A lazily evaluated, possibly nested collection of records.
///
/// Chained operations mutate the dataset in place and return `&mut Self`. Nothing runs until
/// the data is pulled by [`Dataset::get`], [`Dataset::with`], [`Dataset::into_value`] or
/// iteration. The dataset tracks its group level:
///
/// - `0`: a single item
/// - `1`: a flat sequence of records
/// - `n > 1`: groups nested `n - 1` levels above the records
///
/// ```rust
/// use fluent_dataset::{Dataset, SortBy};
/// use serde_json::json;
///
/// let mut ds = Dataset::new(vec![
///     json!({"name": "ann", "dept": "eng", "age": 41}),
///     json!({"name": "bob", "dept": "ops", "age": 29}),
///     json!({"name": "cat", "dept": "eng", "age": 35}),
/// ]);
/// ds.filter(|r| r["age"].as_i64() > Some(30))
///     .sort(SortBy::field("age"))
///     .map(|r| r["name"].clone());
/// assert_eq!(ds.get().unwrap(), json!(["cat", "ann"]));
/// ```
pub struct Dataset {
    data: Node,
    group_level: usize,
    sink: EventSink,
}

impl Dataset {
    /// A level-1 dataset over `records`.
    pub fn new<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        Self::with_options(records, PipelineOptions::default())
    }

    /// A level-1 dataset reporting to the configured observer.
    pub fn with_options<I>(records: I, options: PipelineOptions) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        Self {
            data: Node::records(records),
            group_level: 1,
            sink: EventSink::new(options.observer),
        }
    }

    /// A dataset over already nested data. Every level above 0 must be a JSON array.
    pub fn from_nested(value: Value, group_level: usize) -> DatasetResult<Self> {
        Ok(Self {
            data: Node::from_value(value, group_level)?,
            group_level,
            sink: EventSink::default(),
        })
    }

    /// A level-1 dataset over the records of a CSV or JSON file.
    pub fn from_path(path: impl AsRef<Path>, options: &IngestionOptions) -> DatasetResult<Self> {
        Ok(Self::new(read_records(path, options)?))
    }

    /// Report pipeline events to `observer` from now on.
    pub fn observe(&mut self, observer: Arc<dyn PipelineObserver>) -> &mut Self {
        self.sink = EventSink::new(Some(observer));
        self
    }

    /// Current nesting depth.
    pub fn group_level(&self) -> usize {
        self.group_level
    }

    /// Transform every base record.
    pub fn map<F>(&mut self, mapper: F) -> &mut Self
    where
        F: Fn(Value) -> Value + 'static,
    {
        self.apply(PipelineOp::Map, map(mapper))
    }

    /// Keep the base records for which `predicate` holds, in their original order.
    pub fn filter<F>(&mut self, predicate: F) -> &mut Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        self.apply(PipelineOp::Filter, filter(predicate))
    }

    /// Stable sort of every base group.
    pub fn sort(&mut self, by: SortBy) -> &mut Self {
        log::debug!("sort by {} argument function", by.parameter_count());
        self.apply(PipelineOp::Sort, sort(by))
    }

    /// Split every base group into buckets keyed by `key_fn`. The group level goes up by one.
    pub fn group<F>(&mut self, key_fn: F) -> &mut Self
    where
        F: Fn(&Value) -> Value + 'static,
    {
        let before = self.group_level;
        self.rewrite(&group(key_fn), before);
        self.group_level += 1;
        self.applied(PipelineOp::Group, before);
        self
    }

    /// Remove one level of grouping, applying `f` to every base record.
    ///
    /// At group level 1 the dataset must hold exactly one item, which becomes the single
    /// item of a level-0 dataset as-is; `f` is not applied to it.
    pub fn ungroup<F>(&mut self, f: F) -> DatasetResult<&mut Self>
    where
        F: Fn(Value) -> Value + 'static,
    {
        let before = self.group_level;
        match before {
            0 => return Err(DatasetError::UngroupBelowZero),
            1 => self.collapse()?,
            _ => self.rewrite(&flatten_groups(f), before - 1),
        }
        self.group_level -= 1;
        self.applied(PipelineOp::Ungroup, before);
        Ok(self)
    }

    /// [`Dataset::ungroup`] without transforming records.
    pub fn flatten(&mut self) -> DatasetResult<&mut Self> {
        self.ungroup(|v| v)
    }

    /// Fold every base group into one value, then ungroup.
    ///
    /// At level 1 the result is a level-0 dataset holding the folded value.
    pub fn reduce(&mut self, reducer: impl Into<Reducer>) -> DatasetResult<&mut Self> {
        self.reduce_with(reducer, true)
    }

    /// Fold every base group into a one-element group, keeping the group level.
    pub fn reduce_keep(&mut self, reducer: impl Into<Reducer>) -> &mut Self {
        let before = self.group_level;
        self.rewrite(&reduce(reducer.into()), before);
        self.applied(PipelineOp::Reduce, before);
        self
    }

    /// Fold every base group, optionally ungrouping afterwards.
    ///
    /// A level-0 dataset is folded as a one-record group and stays at level 0.
    pub fn reduce_with(&mut self, reducer: impl Into<Reducer>, ungroup_after: bool) -> DatasetResult<&mut Self> {
        self.reduce_keep(reducer);
        if ungroup_after && self.group_level > 0 {
            self.flatten()?;
        }
        Ok(self)
    }

    /// Keep the first-seen record for each key, in first-seen order.
    pub fn distinct<F>(&mut self, key_fn: F) -> &mut Self
    where
        F: Fn(&Value) -> Value + 'static,
    {
        self.apply(PipelineOp::Distinct, distinct(key_fn))
    }

    /// Join `incoming` into this dataset. Both must be at group level 1.
    ///
    /// See [`crate::merge`] for the matcher shapes and the combination grammar. The call is
    /// validated immediately; rows are only read once the result is pulled.
    pub fn merge(
        &mut self,
        incoming: Dataset,
        matcher: impl Into<Matcher>,
        options: MergeOptions,
    ) -> DatasetResult<&mut Self> {
        if self.group_level != 1 || incoming.group_level != 1 {
            return Err(DatasetError::UnsupportedMergeDepth {
                target: self.group_level,
                incoming: incoming.group_level,
            });
        }
        let plan = MergePlan::new(matcher.into(), options)?;
        log::debug!("merge with {:?}", plan);

        let left = self.take_stream();
        let right = incoming.into_iter();
        self.data = Node::Group(merge_streams(left, right, plan, self.sink.clone()));
        self.applied(PipelineOp::Merge, 1);
        Ok(self)
    }

    /// Materialize the data as nested JSON arrays (a single value at level 0).
    ///
    /// The dataset keeps the materialized data and stays usable.
    pub fn get(&mut self) -> DatasetResult<Value> {
        let data = mem::replace(&mut self.data, Node::group(Vec::new()));
        let value = materialize(data, self.group_level)?;
        self.data = Node::from_value(value.clone(), self.group_level)?;
        self.sink.emit(PipelineEvent::Materialized {
            group_level: self.group_level,
        });
        Ok(value)
    }

    /// Like [`Dataset::get`], applying `f` to every base record of the returned value.
    pub fn get_with<F>(&mut self, f: F) -> DatasetResult<Value>
    where
        F: Fn(Value) -> Value,
    {
        let value = self.get()?;
        recurse_to_value(&f, Node::from_value(value, self.group_level)?, self.group_level)
    }

    /// Materialize and consume the dataset.
    pub fn into_value(self) -> DatasetResult<Value> {
        let value = materialize(self.data, self.group_level)?;
        self.sink.emit(PipelineEvent::Materialized {
            group_level: self.group_level,
        });
        Ok(value)
    }

    /// Materialize and hand the value to `inspect`, keeping the dataset usable.
    pub fn with<F>(&mut self, inspect: F) -> DatasetResult<&mut Self>
    where
        F: FnOnce(&Value),
    {
        let value = self.get()?;
        inspect(&value);
        Ok(self)
    }

    fn apply(&mut self, op: PipelineOp, operation: Operation) -> &mut Self {
        let level = self.group_level;
        self.rewrite(&operation, level);
        self.applied(op, level);
        self
    }

    fn rewrite(&mut self, operation: &Operation, depth: usize) {
        let data = mem::replace(&mut self.data, Node::group(Vec::new()));
        self.data = recurse(operation, data, depth);
    }

    fn applied(&self, op: PipelineOp, level_before: usize) {
        log::debug!("{op}: group_level {level_before} -> {}", self.group_level);
        self.sink.emit(PipelineEvent::OperationApplied {
            op,
            level_before,
            level_after: self.group_level,
        });
    }

    /// Level 1 to level 0: the single top-level item becomes the dataset.
    fn collapse(&mut self) -> DatasetResult<()> {
        let mut items: Vec<Node> = self.take_stream().collect();
        let item = match (items.pop(), items.is_empty()) {
            (Some(item), true) => item,
            (last, _) => {
                items.extend(last);
                let count = items.len();
                self.data = Node::group(items);
                return Err(DatasetError::CollapseNotSingle { count });
            }
        };
        if item.is_group() {
            self.data = Node::group(vec![item]);
            return Err(DatasetError::ShapeMismatch {
                message: "expected a base record at group level 1, found a group".to_string(),
            });
        }
        self.data = item;
        Ok(())
    }

    fn take_stream(&mut self) -> Stream {
        match mem::replace(&mut self.data, Node::group(Vec::new())) {
            Node::Group(items) => items,
            record => Box::new(iter::once(record)),
        }
    }
}

impl IntoIterator for Dataset {
    type Item = Node;
    type IntoIter = Stream;

    /// The top-level sequence as stored. A level-0 dataset yields its single item.
    fn into_iter(self) -> Stream {
        match self.data {
            Node::Group(items) => items,
            record => Box::new(iter::once(record)),
        }
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("group_level", &self.group_level)
            .field("observed", &self.sink.is_observed())
            .finish()
    }
}

/// Operation replacing every group in a sequence with its elements.
fn flatten_groups<F>(f: F) -> Operation
where
    F: Fn(Value) -> Value + 'static,
{
    let f = Rc::new(f);
    Rc::new(move |stream: Stream| -> Stream {
        let f = Rc::clone(&f);
        Box::new(stream.flat_map(move |node| -> Stream {
            let f = Rc::clone(&f);
            match node {
                Node::Group(items) => Box::new(items.map(move |n| apply_to_record(&*f, n))),
                record => Box::new(iter::once(apply_to_record(&*f, record))),
            }
        }))
    })
}

fn apply_to_record<F>(f: &F, node: Node) -> Node
where
    F: Fn(Value) -> Value + ?Sized,
{
    match node {
        Node::Record(v) => Node::Record(f(v)),
        group => group,
    }
}

#[cfg(test)]
mod tests {
    use super::{Dataset, PipelineOptions};
    use crate::error::DatasetError;
    use crate::merge::{KeySelectors, MergeOptions};
    use crate::observer::{PipelineMetrics, PipelineObserver};
    use crate::processing::{Aggregate, Reducer, SortBy};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn people() -> Vec<Value> {
        vec![
            json!({"name": "ann", "dept": "eng", "age": 41}),
            json!({"name": "bob", "dept": "ops", "age": 29}),
            json!({"name": "cat", "dept": "eng", "age": 35}),
            json!({"name": "dan", "dept": "hr", "age": 52}),
        ]
    }

    #[test]
    fn map_and_filter_preserve_order() {
        let mut ds = Dataset::new(people());
        ds.filter(|r| r["dept"] == "eng").map(|r| r["name"].clone());
        assert_eq!(ds.get().unwrap(), json!(["ann", "cat"]));
    }

    #[test]
    fn group_then_reduce_keeps_depth_consistent() {
        let mut ds = Dataset::new(people());
        ds.group(|r| r["dept"].clone());
        assert_eq!(ds.group_level(), 2);

        ds.reduce(Aggregate::new().first("dept", "dept").count("n")).unwrap();
        assert_eq!(ds.group_level(), 1);
        assert_eq!(
            ds.get().unwrap(),
            json!([
                {"dept": "eng", "n": 2},
                {"dept": "ops", "n": 1},
                {"dept": "hr", "n": 1},
            ])
        );
    }

    #[test]
    fn operations_apply_inside_groups() {
        let mut ds = Dataset::new(people());
        ds.group(|r| r["dept"].clone())
            .sort(SortBy::comparator(|a, b| b["age"].as_i64().cmp(&a["age"].as_i64())))
            .map(|r| r["name"].clone());
        assert_eq!(ds.get().unwrap(), json!([["ann", "cat"], ["bob"], ["dan"]]));
    }

    #[test]
    fn reduce_at_level_one_collapses_to_single_item() {
        let mut ds = Dataset::new(people());
        ds.reduce(Reducer::fold(|rows| json!(rows.len()))).unwrap();
        assert_eq!(ds.group_level(), 0);
        assert_eq!(ds.get().unwrap(), json!(4));

        ds.map(|v| json!(v.as_i64().unwrap_or(0) * 10));
        assert_eq!(ds.get().unwrap(), json!(40));
    }

    #[test]
    fn reduce_keep_wraps_result() {
        let mut ds = Dataset::new(people());
        ds.reduce_keep(Aggregate::new().max("oldest", "age"));
        assert_eq!(ds.group_level(), 1);
        assert_eq!(ds.get().unwrap(), json!([{"oldest": 52}]));
    }

    #[test]
    fn reduce_at_level_zero_stays_at_level_zero() {
        let mut ds = Dataset::from_nested(json!({"v": 3}), 0).unwrap();
        ds.reduce(Reducer::fold(|rows| json!(rows.len()))).unwrap();
        assert_eq!(ds.group_level(), 0);
        assert_eq!(ds.get().unwrap(), json!(1));
    }

    #[test]
    fn ungroup_errors() {
        let mut ds = Dataset::new(people());
        let err = ds.flatten().unwrap_err();
        assert!(err.to_string().contains("holds 4 items"));

        let mut single = Dataset::new(vec![json!(1)]);
        single.flatten().unwrap();
        assert_eq!(single.group_level(), 0);
        assert!(single.flatten().unwrap_err().to_string().contains("below group level 0"));
    }

    #[test]
    fn ungroup_at_level_one_keeps_the_item_whole() {
        let mut ds = Dataset::new(vec![json!({"name": "ann", "age": 41})]);
        ds.ungroup(|r| r["name"].clone()).unwrap();
        assert_eq!(ds.group_level(), 0);
        assert_eq!(ds.get().unwrap(), json!({"name": "ann", "age": 41}));
    }

    #[test]
    fn ungroup_of_empty_dataset_is_not_single() {
        let mut ds = Dataset::new(Vec::new());
        let err = ds.flatten().unwrap_err();
        assert!(matches!(err, DatasetError::CollapseNotSingle { count: 0 }));
        assert_eq!(ds.group_level(), 1);
        assert_eq!(ds.get().unwrap(), json!([]));
    }

    #[test]
    fn ungroup_rejects_group_where_record_expected() {
        let mut ds = Dataset::from_nested(json!([[1, 2]]), 2).unwrap();
        ds.group_level = 1;
        let err = ds.flatten().unwrap_err();
        assert!(matches!(err, DatasetError::ShapeMismatch { .. }));
        assert_eq!(ds.group_level(), 1);
        ds.group_level = 2;
        assert_eq!(ds.get().unwrap(), json!([[1, 2]]));
    }

    #[test]
    fn ungroup_applies_function_to_records() {
        let mut ds = Dataset::new(people());
        ds.group(|r| r["dept"].clone())
            .ungroup(|r| r["name"].clone())
            .unwrap();
        assert_eq!(ds.get().unwrap(), json!(["ann", "cat", "bob", "dan"]));
    }

    #[test]
    fn filter_rejecting_level_zero_item_yields_null() {
        let mut ds = Dataset::from_nested(json!(5), 0).unwrap();
        ds.filter(|v| v.as_i64() == Some(6));
        assert_eq!(ds.get().unwrap(), Value::Null);
    }

    #[test]
    fn get_keeps_dataset_usable() {
        let mut ds = Dataset::new(people());
        let mut seen = 0;
        ds.with(|v| seen = v.as_array().map_or(0, Vec::len)).unwrap();
        assert_eq!(seen, 4);
        ds.distinct(|r| r["dept"].clone());
        assert_eq!(ds.get().unwrap().as_array().map(Vec::len), Some(3));
        assert_eq!(
            ds.get_with(|r| r["dept"].clone()).unwrap(),
            json!(["eng", "ops", "hr"])
        );
    }

    #[test]
    fn merge_requires_level_one() {
        let mut grouped = Dataset::new(people());
        grouped.group(|r| r["dept"].clone());
        let err = grouped
            .merge(Dataset::new(people()), KeySelectors::same(["name"]), MergeOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("target=2, incoming=1"));
    }

    #[test]
    fn observer_sees_operations_and_merge() {
        let metrics = Arc::new(PipelineMetrics::new());
        let options = PipelineOptions {
            observer: Some(metrics.clone() as Arc<dyn PipelineObserver>),
        };
        let mut ds = Dataset::with_options(people(), options);
        ds.merge(
            Dataset::new(vec![json!({"name": "bob", "badge": 7})]),
            KeySelectors::same(["name"]),
            MergeOptions::default(),
        )
        .unwrap()
        .map(|r| r["badge"].clone());
        assert_eq!(ds.get().unwrap(), json!([7]));

        let snap = metrics.snapshot();
        assert_eq!(snap.operations, 2);
        assert_eq!(snap.materializations, 1);
        assert_eq!(snap.merges, 1);
        assert_eq!(snap.merge_rows_emitted, 1);
    }
}
