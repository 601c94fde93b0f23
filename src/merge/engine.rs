//! Hash-bucket join driving the merge grammar.
//!
//! The left side is indexed once in a [`KeyedBucketStore`]. Right rows then probe it in
//! order, and every combination the combiner keeps is streamed out. Left buckets that no
//! right row matched are offered to the combiner last, as `(left, None)`, so the
//! unmatched token applies to both sides.

use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::method::{Combiner, MergeMethod};
use super::selectors::{KeyFn, KeySelectors};
use crate::error::{DatasetError, DatasetResult};
use crate::observer::{EventSink, MergeStats, PipelineEvent};
use crate::processing::buckets::KeyedBucketStore;
use crate::types::{Key, Node, Stream};

/// Maps each merged output row (record-equality merges only).
pub type RecordMapper = Rc<dyn Fn(Value) -> Value>;

/// How left and right rows are matched.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Field equality lowered to per-side key functions. Rows are combined by
    /// [`MergeOptions::combiner`].
    On(KeySelectors),
    /// Whole records compared by deep value equality, combined with the given method.
    /// [`MergeOptions::mapper`] may reshape each output row.
    Records(MergeMethod),
}

impl From<KeySelectors> for Matcher {
    fn from(selectors: KeySelectors) -> Self {
        Self::On(selectors)
    }
}

/// Options for a merge call.
#[derive(Clone, Default)]
pub struct MergeOptions {
    /// Row combiner. `None` means `both null` (inner join).
    pub combiner: Option<Combiner>,
    /// Output row mapper for [`Matcher::Records`] merges.
    pub mapper: Option<RecordMapper>,
    /// Index only the first left row per key, and process each right key once.
    pub distinct: bool,
}

impl MergeOptions {
    /// Combine rows with a keyword method.
    pub fn method(method: MergeMethod) -> Self {
        Self {
            combiner: Some(Combiner::Method(method)),
            ..Self::default()
        }
    }

    /// Parse `"<onMatched> <onUnmatched>"` into options.
    pub fn keywords(method: &str) -> DatasetResult<Self> {
        Ok(Self::method(method.parse()?))
    }

    /// Combine rows with a custom function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, Option<&Value>) -> Option<Value> + 'static,
    {
        Self {
            combiner: Some(Combiner::custom(f)),
            ..Self::default()
        }
    }

    /// Reshape every output row (record-equality merges).
    pub fn with_mapper<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + 'static,
    {
        self.mapper = Some(Rc::new(f));
        self
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}

impl fmt::Debug for MergeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeOptions")
            .field("combiner", &self.combiner)
            .field("mapper_set", &self.mapper.is_some())
            .field("distinct", &self.distinct)
            .finish()
    }
}

/// A validated merge: key selectors, combiner, optional mapper.
#[derive(Clone)]
pub struct MergePlan {
    selectors: KeySelectors,
    combiner: Combiner,
    mapper: Option<RecordMapper>,
    distinct: bool,
}

impl MergePlan {
    /// Validate a matcher/options pair before any row is touched.
    pub fn new(matcher: Matcher, options: MergeOptions) -> DatasetResult<Self> {
        match matcher {
            Matcher::On(selectors) => {
                if options.mapper.is_some() {
                    return Err(DatasetError::ParameterMismatch {
                        message: "a field-equality merge combines (left, right) pairs; \
                                  pass a combiner instead of a record mapper"
                            .to_string(),
                    });
                }
                Ok(Self {
                    selectors,
                    combiner: options.combiner.unwrap_or_default(),
                    mapper: None,
                    distinct: options.distinct,
                })
            }
            Matcher::Records(method) => {
                if options.combiner.is_some() {
                    return Err(DatasetError::ParameterMismatch {
                        message: format!(
                            "a record-equality merge already combines with \"{method}\"; \
                             pass a record mapper instead of a combiner"
                        ),
                    });
                }
                Ok(Self {
                    selectors: KeySelectors::whole_record(),
                    combiner: Combiner::Method(method),
                    mapper: options.mapper,
                    distinct: options.distinct,
                })
            }
        }
    }
}

impl fmt::Debug for MergePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergePlan")
            .field("selectors", &self.selectors)
            .field("combiner", &self.combiner)
            .field("mapper_set", &self.mapper.is_some())
            .field("distinct", &self.distinct)
            .finish()
    }
}

/// Merge two record sequences eagerly.
pub fn merge_records<L, R>(left: L, right: R, matcher: Matcher, options: MergeOptions) -> DatasetResult<Vec<Value>>
where
    L: IntoIterator<Item = Value>,
    L::IntoIter: 'static,
    R: IntoIterator<Item = Value>,
    R::IntoIter: 'static,
{
    let plan = MergePlan::new(matcher, options)?;
    let left: Stream = Box::new(left.into_iter().map(Node::Record));
    let right: Stream = Box::new(right.into_iter().map(Node::Record));
    Ok(merge_streams(left, right, plan, EventSink::default())
        .filter_map(Node::into_record)
        .collect())
}

/// Lazily merge `right` into `left`. Nothing is indexed until the output is first pulled.
pub(crate) fn merge_streams(left: Stream, right: Stream, plan: MergePlan, sink: EventSink) -> Stream {
    let left_key = plan.selectors.left_fn();
    let index_key: BoxedKeyFn = Box::new(move |v: &Value| left_key(v));
    let seen_key: fn(&Key) -> Key = clone_key;

    Box::new(MergeStream {
        left: Some(left),
        right,
        store: KeyedBucketStore::new(index_key, plan.distinct),
        processed: KeyedBucketStore::new(seen_key, true),
        right_key: plan.selectors.right_fn(),
        combiner: plan.combiner,
        mapper: plan.mapper,
        distinct: plan.distinct,
        matched: Vec::new(),
        pending: VecDeque::new(),
        phase: Phase::Probing,
        stats: MergeStats::default(),
        sink,
    })
}

type BoxedKeyFn = Box<dyn Fn(&Value) -> Key>;

fn clone_key(key: &Key) -> Key {
    key.clone()
}

enum Phase {
    Probing,
    LeftOnly(usize),
    Done,
}

struct MergeStream {
    left: Option<Stream>,
    right: Stream,
    store: KeyedBucketStore<Value, BoxedKeyFn>,
    processed: KeyedBucketStore<Key, fn(&Key) -> Key>,
    right_key: KeyFn,
    combiner: Combiner,
    mapper: Option<RecordMapper>,
    distinct: bool,
    matched: Vec<bool>,
    pending: VecDeque<Value>,
    phase: Phase,
    stats: MergeStats,
    sink: EventSink,
}

impl MergeStream {
    fn index_left(&mut self, left: Stream) {
        self.store.add_items(left.filter_map(Node::into_record));
        self.stats.left_rows = self.store.item_count() as u64;
        self.matched = vec![false; self.store.len()];
    }

    fn probe(&mut self, row: Value) {
        let key = (self.right_key)(&row);
        if self.distinct && !self.processed.add_item(key.clone()) {
            self.stats.skipped_duplicates += 1;
            return;
        }
        self.stats.probes += 1;

        match self.store.bucket_index(&row, |_: &Value| key.clone()) {
            Some(idx) => {
                self.matched[idx] = true;
                self.stats.matched_pairs += self.store.bucket_at(idx).map_or(0, |b| b.len() as u64);
            }
            None => self.stats.right_only += 1,
        }

        let combiner = &self.combiner;
        let rows = self
            .store
            .cross_map_row(&row, |_: &Value| key.clone(), |l, r| combiner.apply(l, Some(r)));
        for out in rows.flatten() {
            self.pending.push_back(match &self.mapper {
                Some(mapper) => mapper(out),
                None => out,
            });
        }
    }

    fn emit_left_only(&mut self, idx: usize) {
        if self.matched.get(idx).copied().unwrap_or(true) {
            return;
        }
        let Some(bucket) = self.store.bucket_at(idx) else {
            return;
        };
        for left in bucket {
            self.stats.left_only += 1;
            if let Some(out) = self.combiner.apply(Some(left), None) {
                self.pending.push_back(match &self.mapper {
                    Some(mapper) => mapper(out),
                    None => out,
                });
            }
        }
    }

    fn finish(&mut self) {
        self.phase = Phase::Done;
        log::debug!(
            "merge finished: probes={} matched={} right_only={} left_only={} emitted={}",
            self.stats.probes,
            self.stats.matched_pairs,
            self.stats.right_only,
            self.stats.left_only,
            self.stats.emitted
        );
        self.sink.emit(PipelineEvent::MergeFinished { stats: self.stats });
    }
}

impl Iterator for MergeStream {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                self.stats.emitted += 1;
                return Some(Node::Record(row));
            }
            match self.phase {
                Phase::Probing => {
                    if let Some(left) = self.left.take() {
                        self.index_left(left);
                    }
                    match self.right.next() {
                        Some(node) => {
                            if let Some(row) = node.into_record() {
                                self.probe(row);
                            }
                        }
                        None => self.phase = Phase::LeftOnly(0),
                    }
                }
                Phase::LeftOnly(idx) if idx < self.matched.len() => {
                    self.emit_left_only(idx);
                    self.phase = Phase::LeftOnly(idx + 1);
                }
                Phase::LeftOnly(_) => self.finish(),
                Phase::Done => return None,
            }
        }
    }
}
