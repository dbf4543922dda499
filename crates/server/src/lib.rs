//! snpwizard-server — HTTP search service for the mouse SNP wizard.
//!
//! Provides the REST API and the PostgreSQL store. Filter validation, SQL
//! generation and export encoding live in `snpwizard-core`.

/// REST API layer: Axum router, HTTP handlers, models, metrics.
pub mod api;
/// Shared reference data and its reload source.
pub mod reference;
/// Storage seam and the PostgreSQL implementation.
pub mod store;
