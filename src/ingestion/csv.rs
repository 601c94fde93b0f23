//! CSV record loading.

use std::io::Read;
use std::path::Path;

use serde_json::{Map, Number, Value};

use crate::error::{DatasetError, DatasetResult};
use crate::types::{DataType, Schema};

/// Load a headered CSV file as object records, one per row.
///
/// Rules:
///
/// - CSV must have headers; they become the record field names.
/// - With a schema, headers must contain all schema fields (order can differ) and those
///   columns are parsed according to the field type. Other columns are inferred.
/// - Without a schema every value is inferred: empty is `null`, then integer, float, bool,
///   and finally string.
pub fn read_csv_path(path: impl AsRef<Path>, schema: Option<&Schema>) -> DatasetResult<Vec<Value>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    read_csv_reader(&mut rdr, schema)
}

/// Load CSV records from an existing CSV reader.
pub fn read_csv_reader<R: Read>(rdr: &mut csv::Reader<R>, schema: Option<&Schema>) -> DatasetResult<Vec<Value>> {
    let headers = rdr.headers()?.clone();

    if let Some(schema) = schema {
        if let Some(field) = schema.fields.iter().find(|f| !headers.iter().any(|h| h == f.name)) {
            return Err(DatasetError::SchemaMismatch {
                message: format!(
                    "missing required column '{field}'. headers={:?}",
                    headers.iter().collect::<Vec<_>>(),
                    field = field.name
                ),
            });
        }
    }
    let column_types: Vec<Option<DataType>> = headers
        .iter()
        .map(|h| schema.and_then(|s| s.field(h)).map(|f| f.data_type))
        .collect();

    let mut records = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based, and the header is row 1.
        let user_row = row_idx0 + 2;
        let row = result?;

        let mut record = Map::with_capacity(headers.len());
        for (idx, name) in headers.iter().enumerate() {
            let raw = row.get(idx).unwrap_or("");
            let value = match column_types[idx] {
                Some(data_type) => parse_typed_value(user_row, name, data_type, raw)?,
                None => infer_value(raw),
            };
            record.insert(name.to_string(), value);
        }
        records.push(Value::Object(record));
    }

    log::debug!("read {} csv records ({} columns)", records.len(), headers.len());
    Ok(records)
}

fn parse_typed_value(row: usize, column: &str, data_type: DataType, raw: &str) -> DatasetResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parse_error = |message: String| DatasetError::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::String(trimmed.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Float64 => {
            let f = trimmed.parse::<f64>().map_err(|e| parse_error(e.to_string()))?;
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| parse_error("non-finite float".to_string()))
        }
        DataType::Bool => parse_bool(trimmed).map(Value::Bool).map_err(parse_error),
    }
}

fn infer_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(trimmed.to_owned()),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}
