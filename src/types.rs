//! Core data model types.
//!
//! Records are [`serde_json::Value`]s. Nested data is a tree of [`Node`]s whose inner levels are
//! lazy, single-pass [`Stream`]s. Grouping, de-duplication and joins compare records through
//! hashable [`Key`]s derived from JSON values.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DatasetError, DatasetResult};

/// A lazy, single-pass sequence of nodes.
///
/// Once an element has been pulled it cannot be read again. Pipeline stages always hand their
/// output to the next stage instead of re-reading an earlier stream.
pub type Stream = Box<dyn Iterator<Item = Node>>;

/// One element of nested dataset data.
pub enum Node {
    /// A base record (or the single item of a level-0 dataset).
    Record(Value),
    /// A group: a sequence of records or of further groups.
    Group(Stream),
}

impl Node {
    /// Build a group from anything iterable over nodes.
    pub fn group<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Node>,
        I::IntoIter: 'static,
    {
        Self::Group(Box::new(items.into_iter()))
    }

    /// Build a level-1 group from plain records.
    pub fn records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        Self::Group(Box::new(records.into_iter().map(Node::Record)))
    }

    /// Parse a nested JSON array into nodes nested `level` deep.
    ///
    /// Level 0 accepts any value. Every level above that must be a JSON array.
    pub fn from_value(value: Value, level: usize) -> DatasetResult<Self> {
        if level == 0 {
            return Ok(Self::Record(value));
        }
        match value {
            Value::Array(items) => {
                let children = items
                    .into_iter()
                    .map(|item| Node::from_value(item, level - 1))
                    .collect::<DatasetResult<Vec<_>>>()?;
                Ok(Self::group(children))
            }
            other => Err(DatasetError::ShapeMismatch {
                message: format!("expected an array at nesting level {level}, found {}", kind_of(&other)),
            }),
        }
    }

    /// Returns the record if this node is one.
    pub fn as_record(&self) -> Option<&Value> {
        match self {
            Self::Record(v) => Some(v),
            Self::Group(_) => None,
        }
    }

    /// Consumes the node, returning the record if this node is one.
    pub fn into_record(self) -> Option<Value> {
        match self {
            Self::Record(v) => Some(v),
            Self::Group(_) => None,
        }
    }

    /// `true` for [`Node::Group`].
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group(_))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Record(v) => f.debug_tuple("Record").field(v).finish(),
            Self::Group(_) => f.write_str("Group(..)"),
        }
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A hashable key compared by value.
///
/// Keys are what bucket stores index on. Two keys are equal when the JSON values they were
/// built from are equal by value:
///
/// - integral floats normalize to integers, so `1` and `1.0` produce the same key
/// - object keys ignore field insertion order
/// - arrays compare element-wise, which makes `Key::List` the natural composite key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    /// Bit pattern of a non-integral finite float.
    Float(u64),
    Str(String),
    List(Vec<Key>),
    /// Fields sorted by name.
    Map(Vec<(String, Key)>),
}

impl Key {
    /// Composite key from several parts.
    pub fn composite(parts: impl IntoIterator<Item = Key>) -> Self {
        Self::List(parts.into_iter().collect())
    }
}

impl From<&Value> for Key {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Key::Null,
            Value::Bool(b) => Key::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Key::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Key::UInt(u)
                } else {
                    // `i64::MAX as f64` rounds up to 2^63, so both upper bounds are exclusive.
                    let f = n.as_f64().unwrap_or(0.0);
                    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                        Key::Int(f as i64)
                    } else if f.fract() == 0.0 && f >= 0.0 && f < u64::MAX as f64 {
                        Key::UInt(f as u64)
                    } else {
                        Key::Float(f.to_bits())
                    }
                }
            }
            Value::String(s) => Key::Str(s.clone()),
            Value::Array(items) => Key::List(items.iter().map(Key::from).collect()),
            Value::Object(map) => {
                let mut fields: Vec<(String, Key)> =
                    map.iter().map(|(k, v)| (k.clone(), Key::from(v))).collect();
                fields.sort_by(|a, b| a.0.cmp(&b.0));
                Key::Map(fields)
            }
        }
    }
}

impl From<Value> for Key {
    fn from(value: Value) -> Self {
        Key::from(&value)
    }
}

/// Logical data type for a schema field (used to type CSV columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// A list of fields describing the expected columns of tabular input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Returns the field with the given name, if present.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::{Key, Node};
    use serde_json::json;

    #[test]
    fn integral_floats_and_ints_share_a_key() {
        assert_eq!(Key::from(&json!(1)), Key::from(&json!(1.0)));
        assert_ne!(Key::from(&json!(1)), Key::from(&json!(1.5)));
    }

    #[test]
    fn floats_past_i64_range_do_not_saturate() {
        let two_pow_63 = json!(9223372036854775808.0);
        assert_ne!(Key::from(&two_pow_63), Key::from(&json!(i64::MAX)));
        assert_eq!(Key::from(&two_pow_63), Key::from(&json!(9223372036854775808u64)));
        assert_eq!(Key::from(&json!(-9223372036854775808.0)), Key::from(&json!(i64::MIN)));
        assert_ne!(Key::from(&json!(1e20)), Key::from(&json!(u64::MAX)));
        assert_ne!(Key::from(&json!(1)), Key::from(&json!("1")));
    }

    #[test]
    fn object_keys_ignore_field_order() {
        let a: serde_json::Value = serde_json::from_str(r#"{"a":1,"b":[true,null]}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"b":[true,null],"a":1}"#).unwrap();
        assert_eq!(Key::from(&a), Key::from(&b));
    }

    #[test]
    fn composite_keys_compare_element_wise() {
        let k1 = Key::composite([Key::from(&json!("x")), Key::from(&json!(2))]);
        let k2 = Key::from(&json!(["x", 2]));
        assert_eq!(k1, k2);
    }

    #[test]
    fn from_value_rejects_scalars_where_groups_are_required() {
        let err = Node::from_value(json!([1, 2]), 2).unwrap_err();
        assert!(err.to_string().contains("shape mismatch"));
        assert!(Node::from_value(json!([[1], [2, 3]]), 2).is_ok());
        assert!(Node::from_value(json!(7), 0).unwrap().as_record().is_some());
    }
}
