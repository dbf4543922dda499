//! Shared, atomically replaceable reference data.

use crate::store::{StoreError, VariantStore};
use parking_lot::RwLock;
use snpwizard_core::error::ReferenceError;
use snpwizard_core::reference::{ReferenceData, StrainRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

/// Current reference data. Readers clone the inner `Arc` and release the lock
/// immediately; a reload swaps the whole value.
#[derive(Clone, Default)]
pub struct SharedReference(Arc<RwLock<Arc<ReferenceData>>>);

impl SharedReference {
    pub fn new(data: ReferenceData) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(data))))
    }

    pub fn current(&self) -> Arc<ReferenceData> {
        self.0.read().clone()
    }

    pub fn replace(&self, data: ReferenceData) {
        *self.0.write() = Arc::new(data);
    }
}

/// Where reference data comes from besides the database.
#[derive(Debug, Clone)]
pub struct ReferenceSource {
    /// JSON array of strain column names.
    pub strains_file: PathBuf,
    /// JSON array of `{ "Strain", "Letter" }` display-order entries.
    pub order_file: PathBuf,
}

impl ReferenceSource {
    /// Load the consequence vocabulary and table catalogs from the store and
    /// the strain vocabulary from disk.
    pub async fn load(&self, store: &dyn VariantStore) -> Result<ReferenceData, ReloadError> {
        let catalog = store.load_catalog().await?;
        let strains = StrainRegistry::from_files(&self.strains_file, &self.order_file)?;
        tracing::info!(
            consequences = catalog.consequences.len(),
            tables = catalog.tables.len(),
            strains = strains.names().len(),
            "Reference data loaded"
        );
        Ok(ReferenceData {
            consequences: catalog.consequences,
            strains,
            tables: catalog.tables,
        })
    }
}
