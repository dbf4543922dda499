//! Read-only reference data loaded once at startup.
//!
//! Holds the consequence vocabulary, the strain vocabulary with its display
//! order, and per-table consequence and symbol indices. A [`ReferenceData`]
//! value is immutable; reloading builds a new one and swaps it in whole.

use crate::error::ReferenceError;
use crate::table::VariantTable;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;

/// Postgres truncates identifiers beyond this length.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Ordered consequence names. An index is valid iff `index < len()`.
#[derive(Debug, Clone, Default)]
pub struct ConsequenceVocabulary {
    names: Vec<String>,
    high_impact: Vec<String>,
}

impl ConsequenceVocabulary {
    pub fn new(names: Vec<String>, high_impact: Vec<String>) -> Self {
        Self { names, high_impact }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, index: i64) -> bool {
        index >= 0 && (index as usize) < self.names.len()
    }

    pub fn name(&self, index: i64) -> Option<&str> {
        if self.contains(index) {
            Some(self.names[index as usize].as_str())
        } else {
            None
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Names of the consequences flagged as high impact.
    pub fn high_impact(&self) -> &[String] {
        &self.high_impact
    }

    /// Vocabulary indices of the high-impact consequences.
    pub fn high_impact_ids(&self) -> Vec<usize> {
        self.names
            .iter()
            .enumerate()
            .filter(|(_, n)| self.high_impact.contains(n))
            .map(|(i, _)| i)
            .collect()
    }
}

/// One entry of the strain reference order file (`DOIds.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrainOrderEntry {
    #[serde(rename = "Strain")]
    pub strain: String,
    #[serde(rename = "Letter")]
    pub letter: String,
}

/// The strain vocabulary and its display order.
///
/// Strain names double as genotype column names, so membership here is the
/// allow-list every interpolated strain identifier is checked against.
#[derive(Debug, Clone, Default)]
pub struct StrainRegistry {
    names: Vec<String>,
    known: HashSet<String>,
    letters: HashMap<String, String>,
    order: Vec<StrainOrderEntry>,
}

impl StrainRegistry {
    pub fn new(names: Vec<String>, order: Vec<StrainOrderEntry>) -> Result<Self, ReferenceError> {
        for name in &names {
            validate_identifier(name)?;
        }
        let known = names.iter().cloned().collect();
        let letters = order
            .iter()
            .map(|e| (e.strain.clone(), e.letter.clone()))
            .collect();
        Ok(Self {
            names,
            known,
            letters,
            order,
        })
    }

    /// Load the vocabulary (`strains.json`, a JSON array of names) and the
    /// order file (`DOIds.json`, an array of `{"Strain", "Letter"}`).
    pub fn from_files(strains: &Path, order: &Path) -> Result<Self, ReferenceError> {
        let names: Vec<String> = read_json(strains)?;
        let order: Vec<StrainOrderEntry> = read_json(order)?;
        tracing::debug!(
            strains = names.len(),
            ordered = order.len(),
            "Loaded strain reference files"
        );
        Self::new(names, order)
    }

    pub fn contains(&self, strain: &str) -> bool {
        self.known.contains(strain)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn order(&self) -> &[StrainOrderEntry] {
        &self.order
    }

    /// Display ordering: strains with a letter first (by letter), then the rest alphabetically.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.letters.get(a), self.letters.get(b)) {
            (Some(la), Some(lb)) => la.cmp(lb).then_with(|| a.cmp(b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    pub fn sort(&self, strains: &mut [String]) {
        strains.sort_by(|a, b| self.compare(a, b));
    }
}

fn validate_identifier(name: &str) -> Result<(), ReferenceError> {
    let ok = !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && !name.chars().any(|c| c == '"' || c.is_control());
    if ok {
        Ok(())
    } else {
        Err(ReferenceError::InvalidStrain(name.to_string()))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ReferenceError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ReferenceError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// Per-table reference data: consequences present in the table and its symbol index.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    pub consequences: BTreeSet<usize>,
    /// Lower-case symbol → canonical symbol.
    pub symbols: BTreeMap<String, String>,
}

impl TableCatalog {
    /// Build a catalog, skipping empty and literal `NULL` symbols.
    pub fn new<I>(consequences: BTreeSet<usize>, symbols: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let symbols = symbols
            .into_iter()
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
            .map(|s| (s.to_lowercase(), s))
            .collect();
        Self {
            consequences,
            symbols,
        }
    }

    /// Canonical spelling of a symbol, matched case-insensitively.
    pub fn canonical_symbol(&self, symbol: &str) -> Option<&str> {
        self.symbols.get(&symbol.to_lowercase()).map(String::as_str)
    }
}

/// Everything request handlers need besides the request itself.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub consequences: ConsequenceVocabulary,
    pub strains: StrainRegistry,
    pub tables: BTreeMap<VariantTable, TableCatalog>,
}

impl ReferenceData {
    pub fn table(&self, table: VariantTable) -> Option<&TableCatalog> {
        self.tables.get(&table)
    }

    /// Per-table symbol maps keyed by table name, as served to clients.
    pub fn symbol_maps(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.tables
            .iter()
            .map(|(t, c)| (t.as_str().to_string(), c.symbols.clone()))
            .collect()
    }
}
