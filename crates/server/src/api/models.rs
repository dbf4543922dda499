//! Response data transfer objects for the REST API.
//!
//! Bodies a client also decodes live in `snpwizard_core::wire`; the
//! server-only ones are defined here.

use serde::{Deserialize, Serialize};
use snpwizard_core::reference::ReferenceData;

// Re-export the shared bodies so handlers see one module.
pub use snpwizard_core::wire::*;

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `"ok"` or `"degraded"` when the database does not answer.
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: String,
    pub strains: usize,
    pub consequences: usize,
    pub tables: usize,
}

/// Response body for `POST /admin/reload`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub consequences: usize,
    pub strains: usize,
    pub tables: usize,
    pub symbols: usize,
}

impl ReloadResponse {
    pub fn from_reference(data: &ReferenceData) -> Self {
        Self {
            consequences: data.consequences.len(),
            strains: data.strains.names().len(),
            tables: data.tables.len(),
            symbols: data.tables.values().map(|t| t.symbols.len()).sum(),
        }
    }
}

/// Build the `GET /reference` body.
pub fn reference_response(data: &ReferenceData) -> ReferenceResponse {
    ReferenceResponse {
        consequences: data.consequences.names().to_vec(),
        high_impact: data.consequences.high_impact().to_vec(),
        tables: data
            .tables
            .iter()
            .map(|(t, c)| (t.as_str().to_string(), c.consequences.iter().copied().collect()))
            .collect(),
        strains: data.strains.names().to_vec(),
        strain_order: data.strains.order().to_vec(),
    }
}
