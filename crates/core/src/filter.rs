//! The filter model: a validated, immutable search request.
//!
//! [`FilterParams`] carries the raw query-string pairs exactly as received.
//! [`SearchFilter::from_params`] validates them against the reference data and
//! produces the typed model consumed by the query builder. Fields that belong
//! to a search mode other than the selected one are never read.

use crate::config;
use crate::error::QueryError;
use crate::reference::ReferenceData;
use crate::table::VariantTable;
use std::collections::{BTreeMap, BTreeSet};

/// Raw request parameters, keyed by name, preserving repeated keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    values: BTreeMap<String, Vec<String>>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value; repeated keys accumulate.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// Replace every value stored under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), vec![value.into()]);
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// First non-blank value for `key`, trimmed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)?
            .iter()
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    /// First non-blank value among several spellings of the same parameter.
    pub fn get_any(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Every comma-separated item stored under any of `keys`, trimmed, blanks dropped.
    pub fn list(&self, keys: &[&str]) -> Vec<String> {
        keys.iter()
            .filter_map(|k| self.values.get(*k))
            .flatten()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Iterate `(key, value)` pairs in key order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .flat_map(|(k, vs)| vs.iter().map(move |v| (k.as_str(), v.as_str())))
    }
}

impl<K, V> FromIterator<(K, V)> for FilterParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = FilterParams::new();
        for (k, v) in iter {
            params.push(k, v);
        }
        params
    }
}

/// Row cap of a page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageLimit {
    Bounded(u64),
    Unbounded,
}

impl PageLimit {
    /// Parse the wire form, where `-1` means unbounded.
    pub fn parse(text: &str) -> Result<Self, QueryError> {
        let value: i64 = text
            .trim()
            .parse()
            .map_err(|_| QueryError::invalid(format!("limit '{}' is not an integer", text)))?;
        match value {
            config::UNBOUNDED_LIMIT => Ok(PageLimit::Unbounded),
            v if v > 0 => Ok(PageLimit::Bounded(v as u64)),
            _ => Err(QueryError::invalid("limit must be positive or -1")),
        }
    }

    /// Wire form of the limit.
    pub fn to_param(self) -> i64 {
        match self {
            PageLimit::Bounded(n) => n as i64,
            PageLimit::Unbounded => config::UNBOUNDED_LIMIT,
        }
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        PageLimit::Bounded(config::DEFAULT_PAGE_LIMIT)
    }
}

/// The active search mode together with the data only that mode uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    Symbol(String),
    Symbols(Vec<String>),
    Position {
        chromosome: String,
        start: i64,
        end: i64,
    },
    RsNumber(String),
    All,
}

impl SearchCriteria {
    /// Wire name of the mode (`searchBy`).
    pub fn mode_name(&self) -> &'static str {
        match self {
            SearchCriteria::Symbol(_) => "symbol",
            SearchCriteria::Symbols(_) => "symbols",
            SearchCriteria::Position { .. } => "position",
            SearchCriteria::RsNumber(_) => "rsNumber",
            SearchCriteria::All => "all",
        }
    }
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    pub table: VariantTable,
    pub criteria: SearchCriteria,
    pub consequences: BTreeSet<i32>,
    /// Sorted by the strain reference order.
    pub strains: Vec<String>,
    pub high_confidence: bool,
    pub limit: PageLimit,
    pub offset: u64,
}

impl SearchFilter {
    /// Validate raw parameters against the reference data.
    pub fn from_params(params: &FilterParams, reference: &ReferenceData) -> Result<Self, QueryError> {
        let table = match (params.get("table"), params.get("version"), params.get("dataset")) {
            (Some(t), _, _) => VariantTable::parse(t)?,
            (None, Some(v), Some(d)) => VariantTable::from_parts(v, d)?,
            _ => return Err(QueryError::invalid("missing table")),
        };

        let criteria = parse_criteria(params, reference, table)?;

        let mut consequences = BTreeSet::new();
        for item in params.list(&["consequences", "consequence"]) {
            let index: i64 = item
                .parse()
                .map_err(|_| QueryError::invalid(format!("consequence '{}' is not an index", item)))?;
            if !reference.consequences.contains(index) {
                return Err(QueryError::invalid(format!(
                    "consequence index {} is outside the vocabulary",
                    index
                )));
            }
            consequences.insert(index as i32);
        }

        let mut strains: Vec<String> = Vec::new();
        for strain in params.list(&["strains", "strain"]) {
            let strain = strain.trim_matches('"').to_string();
            if !reference.strains.contains(&strain) {
                return Err(QueryError::invalid(format!("unknown strain '{}'", strain)));
            }
            if !strains.contains(&strain) {
                strains.push(strain);
            }
        }
        reference.strains.sort(&mut strains);

        let high_confidence = params
            .get("highConfidence")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let limit = match params.get("limit") {
            Some(text) => PageLimit::parse(text)?,
            None => PageLimit::default(),
        };

        let offset = match params.get("offset") {
            Some(text) => text
                .parse::<i64>()
                .ok()
                .and_then(|v| u64::try_from(v).ok())
                .ok_or_else(|| QueryError::invalid("offset must be a non-negative integer"))?,
            None => 0,
        };

        Ok(SearchFilter {
            table,
            criteria,
            consequences,
            strains,
            high_confidence,
            limit,
            offset,
        })
    }

    /// File name for exported results, derived from what was searched for.
    pub fn export_name(&self) -> String {
        match &self.criteria {
            SearchCriteria::Symbol(s) => s.clone(),
            SearchCriteria::Symbols(list) => list.join(","),
            SearchCriteria::Position {
                chromosome,
                start,
                end,
            } => format!("chr {} pos {}-{}", chromosome, start, end),
            SearchCriteria::RsNumber(rs) => rs.clone(),
            SearchCriteria::All => config::DEFAULT_EXPORT_NAME.to_string(),
        }
    }
}

fn parse_criteria(
    params: &FilterParams,
    reference: &ReferenceData,
    table: VariantTable,
) -> Result<SearchCriteria, QueryError> {
    let mode = params
        .get("searchBy")
        .ok_or_else(|| QueryError::invalid("missing searchBy"))?;
    let catalog = reference.table(table);
    let canonical = |symbol: &str| -> String {
        catalog
            .and_then(|c| c.canonical_symbol(symbol))
            .unwrap_or(symbol)
            .to_string()
    };

    match mode {
        "symbol" => {
            let symbol = text_param(params, "symbol")?;
            Ok(SearchCriteria::Symbol(canonical(symbol)))
        }
        "symbols" => {
            let raw = params.get("symbols").unwrap_or_default();
            let symbols: Vec<String> = raw
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(canonical)
                .collect();
            if symbols.is_empty() {
                return Err(QueryError::invalid("symbols search needs at least one symbol"));
            }
            if symbols.len() > config::MAX_SYMBOLS {
                return Err(QueryError::invalid(format!(
                    "at most {} symbols per search",
                    config::MAX_SYMBOLS
                )));
            }
            if let Some(s) = symbols.iter().find(|s| s.len() > config::MAX_TEXT_PARAM_LEN) {
                return Err(QueryError::invalid(format!("symbol '{}' is too long", s)));
            }
            Ok(SearchCriteria::Symbols(symbols))
        }
        "position" => {
            let chromosome = text_param(params, "chromosome")?.to_string();
            let start = position(
                params.get_any(&["start", "startPosition"]),
                params.get_any(&["startUnits", "startPositionUnits"]),
                "start",
            )?;
            let end = position(
                params.get_any(&["end", "endPosition"]),
                params.get_any(&["endUnits", "endPositionUnits"]),
                "end",
            )?;
            if start > end {
                return Err(QueryError::InvalidRange { start, end });
            }
            Ok(SearchCriteria::Position {
                chromosome,
                start,
                end,
            })
        }
        "rsNumber" => Ok(SearchCriteria::RsNumber(
            text_param(params, "rsNumber")?.to_string(),
        )),
        "all" => Ok(SearchCriteria::All),
        other => Err(QueryError::invalid(format!("unknown search mode '{}'", other))),
    }
}

fn text_param<'a>(params: &'a FilterParams, key: &str) -> Result<&'a str, QueryError> {
    let value = params
        .get(key)
        .ok_or_else(|| QueryError::invalid(format!("missing {}", key)))?;
    if value.len() > config::MAX_TEXT_PARAM_LEN {
        return Err(QueryError::invalid(format!("{} is too long", key)));
    }
    Ok(value)
}

/// Parse a position such as `1,250` with an optional unit multiplier (`1000` = kb).
fn position(value: Option<&str>, units: Option<&str>, name: &str) -> Result<i64, QueryError> {
    let value = value.ok_or_else(|| QueryError::invalid(format!("missing {} position", name)))?;
    let digits: String = value.chars().filter(|&c| c != ',').collect();
    let base: i64 = digits
        .trim()
        .parse()
        .map_err(|_| QueryError::invalid(format!("{} position '{}' is not an integer", name, value)))?;
    if base < 0 {
        return Err(QueryError::invalid(format!("{} position must not be negative", name)));
    }
    let multiplier: i64 = match units {
        Some(u) => u
            .parse()
            .ok()
            .filter(|&m: &i64| m > 0)
            .ok_or_else(|| QueryError::invalid(format!("invalid {} units '{}'", name, u)))?,
        None => 1,
    };
    base.checked_mul(multiplier)
        .ok_or_else(|| QueryError::invalid(format!("{} position overflows", name)))
}
