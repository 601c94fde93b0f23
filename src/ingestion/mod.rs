//! Loading records from files.
//!
//! Most callers should use [`read_records`] (or [`crate::Dataset::from_path`]) which
//! auto-detects the format by file extension unless [`IngestionOptions::format`] forces one.
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`json`]

pub mod csv;
pub mod json;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;

use crate::error::{DatasetError, DatasetResult};
use crate::types::Schema;

/// Supported ingestion formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// JSON array, single object, or NDJSON.
    Json,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            _ => None,
        }
    }

    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_extension)
    }
}

/// Options controlling record loading.
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, Default)]
pub struct IngestionOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<IngestionFormat>,
    /// Optional schema used to type (CSV) or check (JSON) fields.
    pub schema: Option<Schema>,
}

impl IngestionOptions {
    pub fn with_format(mut self, format: IngestionFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Load every record of a CSV or JSON file.
///
/// # Examples
///
/// ```no_run
/// use fluent_dataset::ingestion::{read_records, IngestionOptions};
///
/// # fn main() -> Result<(), fluent_dataset::DatasetError> {
/// // Uses `.ndjson` to select JSON loading.
/// let records = read_records("events.ndjson", &IngestionOptions::default())?;
/// println!("records={}", records.len());
/// # Ok(())
/// # }
/// ```
pub fn read_records(path: impl AsRef<Path>, options: &IngestionOptions) -> DatasetResult<Vec<Value>> {
    let path = path.as_ref();
    let format = options
        .format
        .or_else(|| IngestionFormat::from_path(path))
        .ok_or_else(|| DatasetError::UnsupportedFormat {
            path: path.display().to_string(),
        })?;

    log::debug!("loading {} as {format:?}", path.display());
    let schema = options.schema.as_ref();
    match format {
        IngestionFormat::Csv => csv::read_csv_path(path, schema),
        IngestionFormat::Json => json::read_json_path(path, schema),
    }
}

/// Load a [`Schema`] stored as JSON, e.g.
/// `{"fields": [{"name": "id", "data_type": "Int64"}]}`.
pub fn read_schema(path: impl AsRef<Path>) -> DatasetResult<Schema> {
    let file = File::open(path.as_ref())?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
