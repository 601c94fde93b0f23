//! Reductions over the records of a group.
//!
//! A [`Reducer`] folds a group's base records into one value. Custom folds take the whole
//! record list. [`Aggregate`] builds an object of named built-in reductions, e.g.
//! `{ "n": count, "total": sum(price) }`.

use std::fmt;
use std::iter;
use std::rc::Rc;

use serde_json::{Map, Number, Value};

use super::recursion::Operation;
use crate::merge::selectors::value_at_path;
use crate::types::{Node, Stream};

/// Built-in reduction operations over a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Count all records (including nulls).
    Count,
    /// Sum numeric values, ignoring nulls.
    Sum,
    /// Minimum numeric value, ignoring nulls.
    Min,
    /// Maximum numeric value, ignoring nulls.
    Max,
    /// Arithmetic mean of numeric values, ignoring nulls.
    Avg,
    /// Field value of the first record.
    First,
    /// Field value of the last record.
    Last,
}

/// One named output of an [`Aggregate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateColumn {
    /// Output field name.
    pub name: String,
    /// Input field path (ignored by [`ReduceOp::Count`]).
    pub field: String,
    /// Reduction to apply.
    pub op: ReduceOp,
}

/// An ordered set of named reductions producing one object per group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    columns: Vec<AggregateColumn>,
}

impl Aggregate {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output column.
    pub fn column(mut self, name: impl Into<String>, op: ReduceOp, field: impl Into<String>) -> Self {
        self.columns.push(AggregateColumn {
            name: name.into(),
            field: field.into(),
            op,
        });
        self
    }

    pub fn count(self, name: impl Into<String>) -> Self {
        self.column(name, ReduceOp::Count, "")
    }

    pub fn sum(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.column(name, ReduceOp::Sum, field)
    }

    pub fn min(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.column(name, ReduceOp::Min, field)
    }

    pub fn max(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.column(name, ReduceOp::Max, field)
    }

    pub fn avg(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.column(name, ReduceOp::Avg, field)
    }

    pub fn first(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.column(name, ReduceOp::First, field)
    }

    pub fn last(self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.column(name, ReduceOp::Last, field)
    }

    /// Output columns in declaration order.
    pub fn columns(&self) -> &[AggregateColumn] {
        &self.columns
    }

    /// Evaluate every column over `records`.
    pub fn apply(&self, records: &[Value]) -> Value {
        let mut out = Map::new();
        for col in &self.columns {
            out.insert(col.name.clone(), reduce_field(records, &col.field, col.op));
        }
        Value::Object(out)
    }
}

/// How a group is folded by `reduce`.
#[derive(Clone)]
pub enum Reducer {
    /// Custom fold over the group's records.
    Fold(Rc<dyn Fn(Vec<Value>) -> Value>),
    /// Named built-in reductions.
    Aggregate(Aggregate),
}

impl Reducer {
    /// Custom fold.
    pub fn fold<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Value + 'static,
    {
        Self::Fold(Rc::new(f))
    }

    /// Apply the reducer to a materialized group.
    pub fn apply(&self, records: Vec<Value>) -> Value {
        match self {
            Self::Fold(f) => f(records),
            Self::Aggregate(agg) => agg.apply(&records),
        }
    }
}

impl From<Aggregate> for Reducer {
    fn from(agg: Aggregate) -> Self {
        Self::Aggregate(agg)
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fold(_) => f.write_str("Reducer::Fold(..)"),
            Self::Aggregate(agg) => f.debug_tuple("Reducer::Aggregate").field(agg).finish(),
        }
    }
}

/// Base-level operation folding each group into a one-element group.
///
/// Wrapping the result keeps the group level unchanged; the dataset decides whether to
/// ungroup afterwards.
pub fn reduce(reducer: Reducer) -> Operation {
    Rc::new(move |stream: Stream| -> Stream {
        let records: Vec<Value> = stream.filter_map(Node::into_record).collect();
        Box::new(iter::once(Node::Record(reducer.apply(records))))
    })
}

/// Reduce one field of `records` with a built-in [`ReduceOp`].
///
/// - `Count` always returns the record count.
/// - `Sum`/`Min`/`Max` return an integer when every numeric input is an integer, and `null`
///   when there are no numeric values.
/// - `Avg` returns a float, or `null` when there are no numeric values.
/// - `First`/`Last` return the field of the first/last record, or `null` for an empty group.
pub fn reduce_field(records: &[Value], field: &str, op: ReduceOp) -> Value {
    match op {
        ReduceOp::Count => Value::from(records.len() as u64),
        ReduceOp::First => records
            .first()
            .map(|r| value_at_path(r, field).clone())
            .unwrap_or(Value::Null),
        ReduceOp::Last => records
            .last()
            .map(|r| value_at_path(r, field).clone())
            .unwrap_or(Value::Null),
        ReduceOp::Sum | ReduceOp::Min | ReduceOp::Max | ReduceOp::Avg => {
            let numbers = records.iter().filter_map(|r| value_at_path(r, field).as_number());
            reduce_numeric(numbers, op)
        }
    }
}

fn reduce_numeric<'a>(numbers: impl Iterator<Item = &'a Number>, op: ReduceOp) -> Value {
    let mut int_acc: Option<i64> = None;
    let mut float_acc: Option<f64> = None;
    let mut all_int = true;
    let mut count = 0usize;

    for n in numbers {
        count += 1;
        let f = n.as_f64().unwrap_or(0.0);
        float_acc = Some(match (op, float_acc) {
            (ReduceOp::Sum | ReduceOp::Avg, Some(a)) => a + f,
            (ReduceOp::Min, Some(a)) => a.min(f),
            (ReduceOp::Max, Some(a)) => a.max(f),
            (_, _) => f,
        });
        match n.as_i64() {
            Some(i) if all_int => {
                int_acc = Some(match (op, int_acc) {
                    (ReduceOp::Sum | ReduceOp::Avg, Some(a)) => a.saturating_add(i),
                    (ReduceOp::Min, Some(a)) => a.min(i),
                    (ReduceOp::Max, Some(a)) => a.max(i),
                    (_, _) => i,
                });
            }
            _ => all_int = false,
        }
    }

    if count == 0 {
        return Value::Null;
    }
    match op {
        ReduceOp::Avg => float_value(float_acc.unwrap_or(0.0) / count as f64),
        _ if all_int => int_acc.map(Value::from).unwrap_or(Value::Null),
        _ => float_acc.map(float_value).unwrap_or(Value::Null),
    }
}

fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}
