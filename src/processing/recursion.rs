//! Depth-aware traversal of nested dataset data.
//!
//! Two strategies share the same depth logic:
//!
//! - [`recurse`] is lazy and single-pass: it rewrites the base level of a nested [`Node`]
//!   tree while passing through the intermediate group levels untouched. The operation runs
//!   only when the rewritten stream is first pulled.
//! - [`recurse_to_value`] is eager: it materializes the whole tree as nested JSON arrays.
//!   Only terminal extraction uses it.

use std::iter;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{DatasetError, DatasetResult};
use crate::types::{Node, Stream};

/// A sequence-to-sequence transform applied at the base level of a dataset.
///
/// The transform may keep length (map), drop items (filter), reorder (sort) or change the
/// shape of its output (group turns records into buckets).
pub type Operation = Rc<dyn Fn(Stream) -> Stream>;

/// Lazily apply `op` to the base level of `data`, which is nested `level` deep.
///
/// - `level == 0`: `data` is a single item. It is wrapped in a one-element stream, `op` is
///   applied immediately and the first output is returned (`null` if `op` produced nothing).
/// - `level == 1`: `op` is applied to the flat record stream when it is first pulled.
/// - `level > 1`: every sub-group is rewritten one level down, in order.
///
/// A record found where a group is expected is passed through as-is. Materialization reports
/// the shape error.
pub fn recurse(op: &Operation, data: Node, level: usize) -> Node {
    if level == 0 {
        return op(Box::new(iter::once(data)))
            .next()
            .unwrap_or(Node::Record(Value::Null));
    }

    let items = match data {
        Node::Group(items) => items,
        record => return record,
    };

    if level == 1 {
        return Node::Group(Box::new(Deferred::new(Rc::clone(op), items)));
    }

    let op = Rc::clone(op);
    Node::Group(Box::new(
        items.map(move |child| recurse(&op, child, level - 1)),
    ))
}

/// Eagerly materialize `data` as nested JSON arrays, applying `f` to each base record.
pub fn recurse_to_value<F>(f: &F, data: Node, level: usize) -> DatasetResult<Value>
where
    F: Fn(Value) -> Value + ?Sized,
{
    let items = match (data, level) {
        (Node::Record(v), 0) => return Ok(f(v)),
        (Node::Group(_), 0) => return Err(shape_error("a single item", "a group", level)),
        (Node::Group(items), _) => items,
        (Node::Record(_), _) => return Err(shape_error("a group", "a record", level)),
    };

    let mut list = Vec::new();
    for item in items {
        let value = if level > 1 {
            recurse_to_value(f, item, level - 1)?
        } else {
            match item {
                Node::Record(v) => f(v),
                Node::Group(_) => return Err(shape_error("a base record", "a group", level)),
            }
        };
        list.push(value);
    }
    Ok(Value::Array(list))
}

/// Materialize without transforming records.
pub fn materialize(data: Node, level: usize) -> DatasetResult<Value> {
    recurse_to_value(&|v| v, data, level)
}

fn shape_error(expected: &str, found: &str, level: usize) -> DatasetError {
    DatasetError::ShapeMismatch {
        message: format!("expected {expected} at group level {level}, found {found}"),
    }
}

/// A stream that applies an operation to its input the first time it is pulled.
struct Deferred {
    pending: Option<(Operation, Stream)>,
    running: Option<Stream>,
}

impl Deferred {
    fn new(op: Operation, input: Stream) -> Self {
        Self {
            pending: Some((op, input)),
            running: None,
        }
    }
}

impl Iterator for Deferred {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        if let Some((op, input)) = self.pending.take() {
            self.running = Some(op(input));
        }
        self.running.as_mut()?.next()
    }
}
