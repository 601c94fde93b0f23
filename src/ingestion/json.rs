//! JSON record loading.
//!
//! Supported inputs:
//! - A JSON array of records: `[{"a":1}, {"a":2}]`
//! - A single JSON object, loaded as one record
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! With a [`Schema`], every record must be an object carrying each schema field (dot paths
//! reach into nested objects) with a value of the declared type. Integers are accepted where
//! floats are declared. Without a schema, records are returned as parsed.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::{DatasetError, DatasetResult};
use crate::merge::selectors::value_at_path;
use crate::types::{kind_of, DataType, Schema};

/// Load JSON records from a file.
pub fn read_json_path(path: impl AsRef<Path>, schema: Option<&Schema>) -> DatasetResult<Vec<Value>> {
    let text = fs::read_to_string(path)?;
    parse_json_str(&text, schema)
}

/// Load JSON records from an in-memory string.
pub fn parse_json_str(input: &str, schema: Option<&Schema>) -> DatasetResult<Vec<Value>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DatasetError::SchemaMismatch {
            message: "json input is empty".to_string(),
        });
    }

    let records = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => items,
        Ok(obj @ Value::Object(_)) => vec![obj],
        Ok(other) => {
            return Err(DatasetError::SchemaMismatch {
                message: format!(
                    "json must be an object, an array of records, or NDJSON; found a top-level {}",
                    kind_of(&other)
                ),
            });
        }
        Err(_) => parse_ndjson(trimmed)?,
    };

    if let Some(schema) = schema {
        check_records(&records, schema)?;
    }
    log::debug!("parsed {} json records", records.len());
    Ok(records)
}

fn parse_ndjson(input: &str) -> DatasetResult<Vec<Value>> {
    let mut records = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str::<Value>(line).map_err(|e| DatasetError::SchemaMismatch {
            message: format!("invalid ndjson at line {}: {e}", i + 1),
        })?;
        records.push(record);
    }
    Ok(records)
}

fn check_records(records: &[Value], schema: &Schema) -> DatasetResult<()> {
    for (idx0, record) in records.iter().enumerate() {
        let row = idx0 + 1;
        if !record.is_object() {
            return Err(DatasetError::SchemaMismatch {
                message: format!("row {row} is not a json object"),
            });
        }
        for field in &schema.fields {
            let value = value_at_path(record, &field.name);
            if value.is_null() && !has_path(record, &field.name) {
                return Err(DatasetError::SchemaMismatch {
                    message: format!("row {row} missing required field '{}'", field.name),
                });
            }
            check_value(row, &field.name, field.data_type, value)?;
        }
    }
    Ok(())
}

/// Distinguishes an explicit `null` from a missing field.
fn has_path(record: &Value, path: &str) -> bool {
    let (parent, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (value_at_path(record, parent), leaf),
        None => (record, path),
    };
    parent.as_object().is_some_and(|obj| obj.contains_key(leaf))
}

fn check_value(row: usize, column: &str, data_type: DataType, value: &Value) -> DatasetResult<()> {
    let ok = match data_type {
        _ if value.is_null() => true,
        DataType::Utf8 => value.is_string(),
        DataType::Bool => value.is_boolean(),
        DataType::Int64 => value.is_i64(),
        DataType::Float64 => value.is_number(),
    };
    if ok {
        return Ok(());
    }
    Err(DatasetError::ParseError {
        row,
        column: column.to_string(),
        raw: value.to_string(),
        message: format!("expected {data_type:?}, found {}", kind_of(value)),
    })
}
