//! Response bodies shared by the server and its clients.

use crate::reference::StrainOrderEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response header carrying the server-measured query duration in milliseconds.
pub const RESPONSE_TIME_HEADER: &str = "x-response-time";

/// Error message returned when a statement exceeds its timeout.
pub const QUERY_TIMEOUT_MESSAGE: &str = "Query Timeout";

/// Error message returned for any unexpected server failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Error message returned for unknown routes.
pub const NOT_FOUND_MESSAGE: &str = "URL not found";

/// Response body for `GET /count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResponse {
    /// Matching rows, counted up to the probe cap.
    pub count: u64,
    /// True when more rows match than are shown exactly.
    #[serde(default)]
    pub capped: bool,
}

/// Response body for `GET /loadMore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    pub columns: Vec<String>,
    /// Cells in `columns` order.
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Response body for `GET /symbols`: per table, lower-case symbol → canonical symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolsResponse {
    pub symbols: BTreeMap<String, BTreeMap<String, String>>,
}

/// Response body for `GET /reference`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceResponse {
    pub consequences: Vec<String>,
    pub high_impact: Vec<String>,
    /// Per table, the consequence indices present in it.
    pub tables: BTreeMap<String, Vec<usize>>,
    pub strains: Vec<String>,
    pub strain_order: Vec<StrainOrderEntry>,
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
