//! The closed set of variant tables a search may target.

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A variant table, identified by genome assembly and variant kind.
///
/// Table names are only ever produced from this enum; request text is matched
/// against it and never interpolated directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantTable {
    Grcm38Snps,
    Grcm38Indels,
    Grcm39Snps,
    Grcm39Indels,
}

impl VariantTable {
    pub const ALL: [VariantTable; 4] = [
        VariantTable::Grcm38Indels,
        VariantTable::Grcm38Snps,
        VariantTable::Grcm39Indels,
        VariantTable::Grcm39Snps,
    ];

    /// SQL identifier of the table.
    pub fn as_str(self) -> &'static str {
        match self {
            VariantTable::Grcm38Snps => "grcm38_snps",
            VariantTable::Grcm38Indels => "grcm38_indels",
            VariantTable::Grcm39Snps => "grcm39_snps",
            VariantTable::Grcm39Indels => "grcm39_indels",
        }
    }

    /// Resolve a table from its SQL name.
    pub fn parse(name: &str) -> Result<Self, QueryError> {
        VariantTable::ALL
            .into_iter()
            .find(|t| t.as_str() == name.trim())
            .ok_or_else(|| QueryError::invalid(format!("unknown table '{}'", name)))
    }

    /// Resolve a table from the `version` (assembly) and `dataset` form fields.
    pub fn from_parts(version: &str, dataset: &str) -> Result<Self, QueryError> {
        Self::parse(&format!(
            "{}_{}",
            version.trim().to_ascii_lowercase(),
            dataset.trim().to_ascii_lowercase()
        ))
    }
}

impl fmt::Display for VariantTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_tables() {
        for t in VariantTable::ALL {
            assert_eq!(VariantTable::parse(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn parse_rejects_injection() {
        let err = VariantTable::parse("grcm38_snps; DROP TABLE symbols").unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilter(_)));
    }

    #[test]
    fn from_parts_normalizes_case() {
        assert_eq!(
            VariantTable::from_parts("GRCm39", "indels").unwrap(),
            VariantTable::Grcm39Indels
        );
    }
}
