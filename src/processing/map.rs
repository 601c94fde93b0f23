//! Record mapping.

use std::rc::Rc;

use serde_json::Value;

use super::recursion::Operation;
use crate::types::{Node, Stream};

/// Base-level operation applying `mapper` to every record, preserving order.
///
/// Nested groups met at the base level are passed through untouched.
pub fn map<F>(mapper: F) -> Operation
where
    F: Fn(Value) -> Value + 'static,
{
    let mapper = Rc::new(mapper);
    Rc::new(move |stream: Stream| -> Stream {
        let mapper = Rc::clone(&mapper);
        Box::new(stream.map(move |node| match node {
            Node::Record(v) => Node::Record(mapper(v)),
            group => group,
        }))
    })
}
