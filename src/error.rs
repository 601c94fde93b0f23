use thiserror::Error;

/// Convenience result type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Error type returned by pipeline, merge and ingestion functions.
///
/// Errors are raised at the point of misuse. A dataset that returned an error from a chained
/// call should not be used further.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// `ungroup` to level 0 found zero or several top-level items.
    #[error("cannot collapse to group level 0: dataset holds {count} items, expected exactly one")]
    CollapseNotSingle { count: usize },

    /// `ungroup` was called on a dataset already at group level 0.
    #[error("cannot ungroup below group level 0")]
    UngroupBelowZero,

    /// The nested data does not match the dataset's group level.
    #[error("shape mismatch: {message}")]
    ShapeMismatch { message: String },

    /// `merge` was called on (or with) a dataset that is not at group level 1.
    #[error("merge requires both datasets at group level 1 (target={target}, incoming={incoming})")]
    UnsupportedMergeDepth { target: usize, incoming: usize },

    /// A merge method token is not part of the keyword grammar.
    #[error("unknown merge keyword '{token}': expected one of {allowed}")]
    UnknownMergeKeyword { token: String, allowed: String },

    /// A merge method string is not made of exactly two tokens.
    #[error("malformed merge method '{input}': expected \"<onMatched> <onUnmatched>\"")]
    MalformedMergeMethod { input: String },

    /// `stack` was used as the unmatched token.
    #[error("'stack' is only valid for matched rows")]
    StackOnUnmatched,

    /// The matcher shape and the merge options disagree.
    #[error("parameter mismatch: {message}")]
    ParameterMismatch { message: String },

    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV ingestion error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON ingestion error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension does not name a supported format and none was forced.
    #[error("unsupported ingestion format for '{path}': expected .csv, .json or .ndjson")]
    UnsupportedFormat { path: String },

    /// The input does not conform to the expected layout or schema.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A value could not be parsed into the required [`crate::types::DataType`].
    #[error("failed to parse value at row {row} column '{column}': {message} (raw='{raw}')")]
    ParseError {
        row: usize,
        column: String,
        raw: String,
        message: String,
    },
}
