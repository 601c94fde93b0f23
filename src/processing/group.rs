//! Grouping and de-duplication.
//!
//! Both build a fresh [`KeyedBucketStore`] per group at the base level. `group` replaces the
//! base sequence with the store's buckets (one level deeper); `distinct` keeps one
//! representative per bucket.

use std::rc::Rc;

use serde_json::Value;

use super::buckets::KeyedBucketStore;
use super::recursion::Operation;
use crate::types::{Key, Node, Stream};

/// Wrap a record-level key selector into a node-level key function.
///
/// Groups met at the base level all share the `null` key.
pub(crate) fn node_key<F>(key_fn: Rc<F>) -> impl Fn(&Node) -> Key
where
    F: Fn(&Value) -> Value + ?Sized,
{
    move |node: &Node| match node.as_record() {
        Some(r) => Key::from(&key_fn(r)),
        None => Key::Null,
    }
}

/// Base-level operation splitting each group into buckets keyed by `key_fn`.
///
/// Buckets are emitted in first-seen key order and keep the input order of their records.
pub fn group<F>(key_fn: F) -> Operation
where
    F: Fn(&Value) -> Value + 'static,
{
    let key_fn = Rc::new(key_fn);
    Rc::new(move |stream: Stream| -> Stream {
        let store = KeyedBucketStore::from_items(node_key(Rc::clone(&key_fn)), false, stream);
        Box::new(store.buckets().map(Node::group))
    })
}

/// Base-level operation keeping the first-seen record for each key, in first-seen order.
pub fn distinct<F>(key_fn: F) -> Operation
where
    F: Fn(&Value) -> Value + 'static,
{
    let key_fn = Rc::new(key_fn);
    Rc::new(move |stream: Stream| -> Stream {
        let store = KeyedBucketStore::from_items(node_key(Rc::clone(&key_fn)), true, stream);
        Box::new(store.buckets().filter_map(|bucket| bucket.into_iter().next()))
    })
}
