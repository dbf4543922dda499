//! Storage seam: executes generated queries and loads reference catalogs.
//!
//! Handlers only see [`VariantStore`]; the PostgreSQL implementation lives in
//! [`postgres`]. Driver errors are mapped to [`StoreError`] here and never
//! reach clients verbatim.

pub mod postgres;

use async_trait::async_trait;
use snpwizard_core::query::GeneratedQuery;
use snpwizard_core::reference::{ConsequenceVocabulary, TableCatalog};
use snpwizard_core::table::VariantTable;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Failure kinds surfaced by a store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The statement exceeded its timeout.
    #[error("statement timeout")]
    Timeout,
    /// The database could not be reached.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// The statement failed for another reason.
    #[error("query failed: {0}")]
    Query(String),
}

/// Rows returned by a page query, cells in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    /// Column labels; empty when no row came back.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Reference data held by the database.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub consequences: ConsequenceVocabulary,
    pub tables: BTreeMap<VariantTable, TableCatalog>,
}

/// Executes generated queries.
///
/// `timeout` of `None` runs without a statement timeout.
#[async_trait]
pub trait VariantStore: Send + Sync + 'static {
    /// Run a count query and return its single `total` value.
    async fn count(&self, query: &GeneratedQuery, timeout: Option<Duration>) -> Result<u64, StoreError>;

    /// Run a row query.
    async fn fetch(&self, query: &GeneratedQuery, timeout: Option<Duration>) -> Result<RowSet, StoreError>;

    /// Load the consequence vocabulary and per-table catalogs.
    async fn load_catalog(&self) -> Result<Catalog, StoreError>;

    /// Check that the database answers.
    async fn ping(&self) -> Result<(), StoreError>;
}
