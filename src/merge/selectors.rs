//! Key selectors for merge matching.
//!
//! A merge matches a left and a right record when an equality predicate over their fields
//! holds, e.g. `l.id == r.order_id && l.region == r.region`. Instead of inspecting such a
//! predicate, callers declare the compared field pairs and this module derives one key
//! function per side. Both produce the composite key the predicate would compare, so a hash
//! lookup on the left side's key answers the predicate for every right row.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::types::Key;

/// Key function for one side of a merge.
pub type KeyFn = Rc<dyn Fn(&Value) -> Key>;

static NULL: Value = Value::Null;

/// Resolve a dot path (`user.name`) inside a record. Missing fields resolve to `null`.
///
/// An empty path returns the record itself.
pub fn value_at_path<'a>(record: &'a Value, path: &str) -> &'a Value {
    if path.is_empty() {
        return record;
    }
    let mut current = record;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment).unwrap_or(&NULL),
            Value::Array(items) => match segment.parse::<usize>() {
                Ok(i) => items.get(i).unwrap_or(&NULL),
                Err(_) => &NULL,
            },
            _ => &NULL,
        };
    }
    current
}

/// One `left.path == right.path` comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPair {
    pub left: String,
    pub right: String,
}

impl FieldPair {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

/// Left/right key functions for a merge.
#[derive(Clone)]
pub struct KeySelectors {
    left: KeyFn,
    right: KeyFn,
    description: String,
}

impl KeySelectors {
    /// Selectors from caller-provided functions; their outputs are compared by value.
    pub fn new<L, R>(left: L, right: R) -> Self
    where
        L: Fn(&Value) -> Value + 'static,
        R: Fn(&Value) -> Value + 'static,
    {
        Self {
            left: Rc::new(move |v: &Value| Key::from(&left(v))),
            right: Rc::new(move |v: &Value| Key::from(&right(v))),
            description: "custom".to_string(),
        }
    }

    /// Selectors for a conjunction of `left == right` field-path pairs.
    pub fn on<I, L, R>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: Into<String>,
    {
        let pairs: Vec<FieldPair> = pairs
            .into_iter()
            .map(|(l, r)| FieldPair::new(l, r))
            .collect();
        equality_to_key_selectors(&pairs)
    }

    /// Selectors comparing the same field paths on both sides.
    pub fn same<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::on(fields.into_iter().map(|f| {
            let f: String = f.into();
            (f.clone(), f)
        }))
    }

    /// Whole records compared by deep value equality.
    pub fn whole_record() -> Self {
        Self {
            left: Rc::new(|v: &Value| Key::from(v)),
            right: Rc::new(|v: &Value| Key::from(v)),
            description: "whole record".to_string(),
        }
    }

    pub fn left_key(&self, record: &Value) -> Key {
        (self.left)(record)
    }

    pub fn right_key(&self, record: &Value) -> Key {
        (self.right)(record)
    }

    /// Shared handle to the left key function.
    pub fn left_fn(&self) -> KeyFn {
        Rc::clone(&self.left)
    }

    /// Shared handle to the right key function.
    pub fn right_fn(&self) -> KeyFn {
        Rc::clone(&self.right)
    }
}

impl fmt::Debug for KeySelectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySelectors")
            .field("on", &self.description)
            .finish()
    }
}

/// Turn an equality predicate, given as field-path pairs, into per-side key functions.
///
/// A single pair yields the field value itself as key; several pairs yield a composite
/// [`Key::List`] in pair order. No pairs means every record shares one key (a cross join).
pub fn equality_to_key_selectors(pairs: &[FieldPair]) -> KeySelectors {
    let left_paths: Vec<String> = pairs.iter().map(|p| p.left.clone()).collect();
    let right_paths: Vec<String> = pairs.iter().map(|p| p.right.clone()).collect();
    let description = pairs
        .iter()
        .map(|p| format!("l.{} == r.{}", p.left, p.right))
        .collect::<Vec<_>>()
        .join(" && ");

    KeySelectors {
        left: paths_key(left_paths),
        right: paths_key(right_paths),
        description,
    }
}

fn paths_key(paths: Vec<String>) -> KeyFn {
    if let [single] = paths.as_slice() {
        let single = single.clone();
        return Rc::new(move |record: &Value| Key::from(value_at_path(record, &single)));
    }
    Rc::new(move |record: &Value| Key::composite(paths.iter().map(|p| Key::from(value_at_path(record, p)))))
}
