//! Parameterized SQL generation for variant searches.
//!
//! [`builder::QueryBuilder`] turns a [`SearchFilter`](crate::filter::SearchFilter)
//! into a [`GeneratedQuery`]: SQL text with positional placeholders plus the
//! values bound to them. Identifiers (table, columns, strains) only ever come
//! from closed enumerations or the strain allow-list.

pub mod builder;

use crate::error::QueryError;
use crate::reference::StrainRegistry;
use std::collections::BTreeSet;
use std::fmt;

pub use builder::QueryBuilder;

/// A value bound to a positional placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    IntArray(Vec<i32>),
}

impl fmt::Display for SqlValue {
    /// Literal form; integer arrays render as Postgres array literals (`{0,3}`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::IntArray(values) => {
                let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{{{}}}", items.join(","))
            }
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Int(i)
    }
}

/// SQL text and its ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuery {
    pub text: String,
    pub params: Vec<SqlValue>,
}

impl GeneratedQuery {
    /// Distinct `$n` placeholder indices appearing in the text.
    pub fn placeholder_indices(&self) -> BTreeSet<usize> {
        let bytes = self.text.as_bytes();
        let mut indices = BTreeSet::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let digits: String = self.text[i + 1..]
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect();
                if let Ok(n) = digits.parse::<usize>() {
                    indices.insert(n);
                }
                i += 1 + digits.len();
            } else {
                i += 1;
            }
        }
        indices
    }

    /// Highest `$n` placeholder index appearing in the text.
    pub fn max_placeholder(&self) -> usize {
        self.placeholder_indices().last().copied().unwrap_or(0)
    }

    /// True when the text uses exactly `$1..=$n` for its `n` parameters.
    pub fn placeholders_match_params(&self) -> bool {
        self.placeholder_indices()
            .into_iter()
            .eq(1..=self.params.len())
    }
}

/// Fixed, non-strain columns a page request may project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseColumn {
    Symbol,
    Chrom,
    Pos,
    RsNumber,
    Consequence,
    ProteinPosition,
    AminoAcids,
    Sift,
    Ref,
}

impl BaseColumn {
    pub const ALL: [BaseColumn; 9] = [
        BaseColumn::Symbol,
        BaseColumn::Chrom,
        BaseColumn::Pos,
        BaseColumn::RsNumber,
        BaseColumn::Consequence,
        BaseColumn::ProteinPosition,
        BaseColumn::AminoAcids,
        BaseColumn::Sift,
        BaseColumn::Ref,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BaseColumn::Symbol => "symbol",
            BaseColumn::Chrom => "chrom",
            BaseColumn::Pos => "pos",
            BaseColumn::RsNumber => "rs_number",
            BaseColumn::Consequence => "consequence",
            BaseColumn::ProteinPosition => "protein_position",
            BaseColumn::AminoAcids => "amino_acids",
            BaseColumn::Sift => "sift",
            BaseColumn::Ref => "ref",
        }
    }

    /// Qualified SQL reference. The symbol comes from the joined symbols table.
    pub fn sql(self) -> &'static str {
        match self {
            BaseColumn::Symbol => "sym.symbol",
            BaseColumn::Chrom => "main.chrom",
            BaseColumn::Pos => "main.pos",
            BaseColumn::RsNumber => "main.rs_number",
            BaseColumn::Consequence => "main.consequence",
            BaseColumn::ProteinPosition => "main.protein_position",
            BaseColumn::AminoAcids => "main.amino_acids",
            BaseColumn::Sift => "main.sift",
            BaseColumn::Ref => "main.ref",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        BaseColumn::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// One projected column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResultColumn {
    Base(BaseColumn),
    Strain(String),
}

impl ResultColumn {
    pub fn name(&self) -> &str {
        match self {
            ResultColumn::Base(c) => c.name(),
            ResultColumn::Strain(s) => s,
        }
    }
}

/// Column projection of a page query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Columns(Vec<ResultColumn>),
}

impl Projection {
    /// Parse the `columns` request parameter against the allow-list.
    ///
    /// Accepts `*` or a comma list of base column names and (optionally quoted)
    /// strain names.
    pub fn parse(text: &str, strains: &StrainRegistry) -> Result<Self, QueryError> {
        let text = text.trim();
        if text == "*" {
            return Ok(Projection::All);
        }
        let mut columns = Vec::new();
        for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let name = item.trim_matches('"');
            let column = match BaseColumn::parse(name) {
                Some(base) => ResultColumn::Base(base),
                None if strains.contains(name) => ResultColumn::Strain(name.to_string()),
                None => return Err(QueryError::invalid(format!("unknown column '{}'", name))),
            };
            columns.push(column);
        }
        if columns.is_empty() {
            return Err(QueryError::invalid("empty column list"));
        }
        Ok(Projection::Columns(columns))
    }

    /// The projection used by the results table: every base column, then the strains.
    pub fn for_strains<S: AsRef<str>>(strains: &[S]) -> Self {
        let mut columns: Vec<ResultColumn> =
            BaseColumn::ALL.into_iter().map(ResultColumn::Base).collect();
        columns.extend(strains.iter().map(|s| ResultColumn::Strain(s.as_ref().to_string())));
        Projection::Columns(columns)
    }

    /// Wire form accepted by [`Projection::parse`].
    pub fn to_param(&self) -> String {
        match self {
            Projection::All => "*".to_string(),
            Projection::Columns(columns) => columns
                .iter()
                .map(|c| match c {
                    ResultColumn::Base(b) => b.name().to_string(),
                    ResultColumn::Strain(s) => format!("\"{}\"", s),
                })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strains() -> StrainRegistry {
        StrainRegistry::new(vec!["A_J".into(), "NOD_ShiLtJ".into()], vec![]).unwrap()
    }

    #[test]
    fn projection_parses_client_column_list() {
        let text = "symbol, chrom, pos, rs_number, consequence, protein_position, amino_acids, sift, ref, \"A_J\", \"NOD_ShiLtJ\"";
        let projection = Projection::parse(text, &strains()).unwrap();
        assert_eq!(projection, Projection::for_strains(&["A_J", "NOD_ShiLtJ"]));
        assert_eq!(projection.to_param(), text);
    }

    #[test]
    fn projection_rejects_unknown_identifiers() {
        for bad in ["password", "symbol, pg_sleep(10)", "\"C57BL_6J\"", "", " , "] {
            assert!(
                matches!(Projection::parse(bad, &strains()), Err(QueryError::InvalidFilter(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn array_literal_display() {
        assert_eq!(SqlValue::IntArray(vec![0, 3]).to_string(), "{0,3}");
        assert_eq!(SqlValue::IntArray(vec![]).to_string(), "{}");
    }

    #[test]
    fn max_placeholder_reads_highest_index() {
        let q = GeneratedQuery {
            text: "a = $1 AND b BETWEEN $2 AND $10 LIMIT $3".into(),
            params: vec![],
        };
        assert_eq!(q.max_placeholder(), 10);
        assert_eq!(q.placeholder_indices().len(), 4);
    }

    #[test]
    fn placeholders_must_cover_every_param() {
        let dense = GeneratedQuery {
            text: "a = $1 AND b = $2 AND c && $3".into(),
            params: vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::IntArray(vec![0])],
        };
        assert!(dense.placeholders_match_params());

        let gap = GeneratedQuery {
            text: "a = $1 AND c && $3".into(),
            params: vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::IntArray(vec![0])],
        };
        assert_eq!(gap.max_placeholder(), gap.params.len());
        assert!(!gap.placeholders_match_params());
    }
}
