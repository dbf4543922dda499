//! Error types for filter validation, query construction, reference loading and export.

use thiserror::Error;

/// Errors raised while turning request parameters into SQL.
///
/// All variants are raised before any query text exists, so a rejected
/// request never reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Unknown table, column, strain, consequence or search mode, or a malformed value.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A row-reading query was requested with no consequence selected.
    #[error("no consequence selected")]
    EmptyConsequenceSelection,

    /// Position range whose start lies after its end.
    #[error("invalid range: start {start} is after end {end}")]
    InvalidRange { start: i64, end: i64 },
}

impl QueryError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        QueryError::InvalidFilter(msg.into())
    }
}

/// Errors raised while loading reference data files.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A strain identifier that cannot be used as a column name.
    #[error("invalid strain identifier {0:?}")]
    InvalidStrain(String),
}

/// Errors raised while decoding compact row encodings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("consequence index {0} is outside the vocabulary")]
    UnknownConsequence(i64),

    #[error("unexpected consequence value: {0}")]
    MalformedConsequence(String),

    #[error("row has {actual} cells, expected {expected}")]
    RowWidth { expected: usize, actual: usize },
}

/// Errors raised while writing exported result files.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// More rows or columns than a worksheet holds.
    #[error("export too large for a worksheet: {0}")]
    SheetLimit(String),

    #[error("unknown export format '{0}'")]
    UnknownFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
