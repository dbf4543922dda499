//! # snpwizard-core
//!
//! Search model and SQL generation for the mouse SNP wizard: a search
//! service over per-assembly SNP and indel tables, queried by gene symbol,
//! position, rs-number, consequence and strain genotype.
//!
//! This crate has no async or database dependencies. It turns request
//! parameters into a validated [`filter::SearchFilter`], builds parameterized
//! SQL from it, and decodes and exports the rows that come back.
//!
//! ```text
//! FilterParams → SearchFilter → QueryBuilder → (SQL text, params)
//! rows → RowDecoder → display cells / CSV export
//! ```

/// Global configuration constants: paging caps, timeouts, limits, and defaults.
pub mod config;
/// Decoding of consequence indices and genotype codes into display values.
pub mod decode;
/// Error types for filters, reference data, decoding and export.
pub mod error;
/// Reference/alternatives export encoding and CSV writer.
pub mod export;
/// Raw request parameters and the validated search filter.
pub mod filter;
/// Parameterized SQL generation: projections, bound values, and the query builder.
pub mod query;
/// Read-only reference data: consequence vocabulary, strain registry, symbol indices.
pub mod reference;
/// The closed set of variant tables.
pub mod table;
/// Response bodies and header names shared by server and client.
pub mod wire;
