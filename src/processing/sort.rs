//! Per-group sorting.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::recursion::Operation;
use crate::types::{Node, Stream};

/// How to order records within each group.
///
/// The two variants correspond to the two forms a sort function can take: a two-argument
/// comparator, or a one-argument key extractor.
#[derive(Clone)]
pub enum SortBy {
    /// Compare two records directly.
    Comparator(Rc<dyn Fn(&Value, &Value) -> Ordering>),
    /// Extract a sort key; keys are compared with [`compare_values`].
    Key(Rc<dyn Fn(&Value) -> Value>),
}

impl SortBy {
    /// Sort with a comparator.
    pub fn comparator<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value) -> Ordering + 'static,
    {
        Self::Comparator(Rc::new(f))
    }

    /// Sort by an extracted key, ascending.
    pub fn key<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Value + 'static,
    {
        Self::Key(Rc::new(f))
    }

    /// Sort by a field (dot paths reach into nested objects), ascending.
    pub fn field(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::key(move |r| crate::merge::selectors::value_at_path(r, &path).clone())
    }

    /// Number of arguments the sort function takes (2 for a comparator, 1 for a key).
    pub fn parameter_count(&self) -> usize {
        match self {
            Self::Comparator(_) => 2,
            Self::Key(_) => 1,
        }
    }
}

impl fmt::Debug for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comparator(_) => f.write_str("SortBy::Comparator(..)"),
            Self::Key(_) => f.write_str("SortBy::Key(..)"),
        }
    }
}

/// Base-level operation sorting each group. The sort is stable.
///
/// Sorting needs the whole group, so the group is collected when first pulled.
pub fn sort(by: SortBy) -> Operation {
    Rc::new(move |stream: Stream| -> Stream {
        let mut nodes: Vec<Node> = stream.collect();
        match &by {
            SortBy::Comparator(cmp) => nodes.sort_by(|a, b| match (a.as_record(), b.as_record()) {
                (Some(a), Some(b)) => cmp(a, b),
                _ => Ordering::Equal,
            }),
            SortBy::Key(key) => {
                let mut keyed: Vec<(Option<Value>, Node)> = nodes
                    .into_iter()
                    .map(|n| (n.as_record().map(|r| key(r)), n))
                    .collect();
                keyed.sort_by(|(a, _), (b, _)| match (a, b) {
                    (Some(a), Some(b)) => compare_values(a, b),
                    _ => Ordering::Equal,
                });
                nodes = keyed.into_iter().map(|(_, n)| n).collect();
            }
        }
        Box::new(nodes.into_iter())
    })
}

/// Total order over JSON values.
///
/// Values of different kinds order as `null < bool < number < string < array < object`.
/// Numbers compare numerically, strings lexicographically, arrays element-wise. Objects
/// compare by their sorted `(field, value)` pairs.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => {
            let mut xs: Vec<_> = x.iter().collect();
            let mut ys: Vec<_> = y.iter().collect();
            xs.sort_by(|l, r| l.0.cmp(r.0));
            ys.sort_by(|l, r| l.0.cmp(r.0));
            for ((xk, xv), (yk, yv)) in xs.iter().zip(ys.iter()) {
                let ord = xk.cmp(yk).then_with(|| compare_values(xv, yv));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            xs.len().cmp(&ys.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::{compare_values, sort, SortBy};
    use crate::processing::recursion::{materialize, recurse};
    use crate::types::Node;
    use serde_json::json;
    use std::cmp::Ordering;

    #[test]
    fn key_sort_is_stable() {
        let data = Node::records(vec![
            json!({"n": "a", "k": 2}),
            json!({"n": "b", "k": 1}),
            json!({"n": "c", "k": 2}),
            json!({"n": "d", "k": 1}),
        ]);
        let out = materialize(recurse(&sort(SortBy::field("k")), data, 1), 1).unwrap();
        let names: Vec<&str> = out
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["n"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn comparator_sort_descending() {
        let data = Node::records(vec![json!(3), json!(1), json!(2)]);
        let by = SortBy::comparator(|a, b| compare_values(b, a));
        assert_eq!(by.parameter_count(), 2);
        let out = materialize(recurse(&sort(by), data, 1), 1).unwrap();
        assert_eq!(out, json!([3, 2, 1]));
    }

    #[test]
    fn sorts_each_group_independently() {
        let data = Node::from_value(json!([[3, 1], [9, 4, 5]]), 2).unwrap();
        let out = materialize(recurse(&sort(SortBy::key(|v| v.clone())), data, 2), 2).unwrap();
        assert_eq!(out, json!([[1, 3], [4, 5, 9]]));
    }

    #[test]
    fn compare_values_orders_across_kinds() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!(1.5), &json!(1)), Ordering::Greater);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 2, 0])), Ordering::Less);
    }
}
