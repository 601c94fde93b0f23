//! Record filtering.

use std::rc::Rc;

use serde_json::Value;

use super::recursion::Operation;
use crate::types::{Node, Stream};

/// Base-level operation keeping records for which `predicate` returns `true`.
///
/// Relative order of kept records is preserved.
pub fn filter<F>(predicate: F) -> Operation
where
    F: Fn(&Value) -> bool + 'static,
{
    let predicate = Rc::new(predicate);
    Rc::new(move |stream: Stream| -> Stream {
        let predicate = Rc::clone(&predicate);
        Box::new(stream.filter(move |node| match node {
            Node::Record(v) => predicate(v),
            Node::Group(_) => true,
        }))
    })
}
