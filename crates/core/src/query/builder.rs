//! SQL assembly for page and count queries.

use super::{GeneratedQuery, Projection, ResultColumn, SqlValue};
use crate::config;
use crate::error::QueryError;
use crate::filter::{PageLimit, SearchCriteria, SearchFilter};
use crate::reference::StrainRegistry;

const BASE_JOIN: &str = "LEFT JOIN symbols AS sym ON main.symbol_id = sym.id";
const ORDERING: &str = "ORDER BY main.chrom, main.pos ASC";

/// Builds parameterized queries from validated filters.
///
/// Holds only the strain allow-list; building is pure and deterministic.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    strains: &'a StrainRegistry,
}

/// Accumulates bound values and hands out their placeholders.
#[derive(Default)]
struct Binder {
    values: Vec<SqlValue>,
}

impl Binder {
    fn bind(&mut self, value: impl Into<SqlValue>) -> String {
        self.values.push(value.into());
        format!("${}", self.values.len())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl<'a> QueryBuilder<'a> {
    pub fn new(strains: &'a StrainRegistry) -> Self {
        Self { strains }
    }

    /// Build the row query for a page request.
    pub fn build(
        &self,
        filter: &SearchFilter,
        projection: &Projection,
        ordered: bool,
    ) -> Result<GeneratedQuery, QueryError> {
        let select = self.select_list(projection)?;
        self.assemble(filter, &select, ordered, filter.limit, filter.offset)
    }

    /// Build the capped count probe: counts at most
    /// [`COUNT_PROBE_LIMIT`](config::COUNT_PROBE_LIMIT) matching rows.
    pub fn build_count(&self, filter: &SearchFilter) -> Result<GeneratedQuery, QueryError> {
        let inner = self.assemble(
            filter,
            "1",
            false,
            PageLimit::Bounded(config::COUNT_PROBE_LIMIT),
            0,
        )?;
        Ok(GeneratedQuery {
            text: format!("SELECT COUNT(*) AS total FROM ({}) AS capped", inner.text),
            params: inner.params,
        })
    }

    fn checked_strain(&self, strain: &str) -> Result<String, QueryError> {
        if self.strains.contains(strain) {
            Ok(quote_ident(strain))
        } else {
            Err(QueryError::invalid(format!("unknown strain '{}'", strain)))
        }
    }

    fn select_list(&self, projection: &Projection) -> Result<String, QueryError> {
        match projection {
            Projection::All => Ok("*".to_string()),
            Projection::Columns(columns) if columns.is_empty() => {
                Err(QueryError::invalid("empty column list"))
            }
            Projection::Columns(columns) => {
                let mut parts = Vec::with_capacity(columns.len());
                for column in columns {
                    parts.push(match column {
                        ResultColumn::Base(base) => base.sql().to_string(),
                        ResultColumn::Strain(s) => format!("main.{}", self.checked_strain(s)?),
                    });
                }
                Ok(parts.join(", "))
            }
        }
    }

    fn strain_predicate(&self, strain: &str, high_confidence: bool) -> Result<String, QueryError> {
        let col = format!("main.{}", self.checked_strain(strain)?);
        let differs = format!("{col} != '?' AND UPPER(main.ref) != UPPER({col})");
        Ok(if high_confidence {
            format!("(LEFT({col}, 1) = UPPER(LEFT({col}, 1)) AND {differs})")
        } else {
            format!("({differs})")
        })
    }

    fn assemble(
        &self,
        filter: &SearchFilter,
        select: &str,
        ordered: bool,
        limit: PageLimit,
        offset: u64,
    ) -> Result<GeneratedQuery, QueryError> {
        if filter.consequences.is_empty() {
            return Err(QueryError::EmptyConsequenceSelection);
        }
        let strain_clauses = filter
            .strains
            .iter()
            .map(|s| self.strain_predicate(s, filter.high_confidence))
            .collect::<Result<Vec<_>, _>>()?;

        let mut binder = Binder::default();
        let mut predicates = Vec::new();

        match &filter.criteria {
            SearchCriteria::Symbol(symbol) => {
                predicates.push(format!("sym.symbol = {}", binder.bind(symbol.as_str())));
            }
            SearchCriteria::Symbols(symbols) => {
                let mut alternatives = Vec::with_capacity(symbols.len());
                for symbol in symbols {
                    alternatives.push(format!("sym.symbol = {}", binder.bind(symbol.as_str())));
                }
                predicates.push(format!("({})", alternatives.join(" OR ")));
            }
            SearchCriteria::Position {
                chromosome,
                start,
                end,
            } => {
                let chrom = binder.bind(chromosome.as_str());
                let lo = binder.bind(*start);
                let hi = binder.bind(*end);
                predicates.push(format!("main.chrom = {} AND main.pos BETWEEN {} AND {}", chrom, lo, hi));
            }
            SearchCriteria::RsNumber(rs) => {
                predicates.push(format!("main.rs_number = {}", binder.bind(rs.as_str())));
            }
            SearchCriteria::All => {}
        }

        let consequences: Vec<i32> = filter.consequences.iter().copied().collect();
        predicates.push(format!(
            "main.consequence::int4[] && {}",
            binder.bind(SqlValue::IntArray(consequences))
        ));

        match strain_clauses.len() {
            0 => {}
            1 => predicates.extend(strain_clauses),
            _ => predicates.push(format!("({})", strain_clauses.join(" OR "))),
        }

        let mut text = format!(
            "SELECT {} FROM {} AS main {} WHERE {}",
            select,
            filter.table.as_str(),
            BASE_JOIN,
            predicates.join(" AND ")
        );
        if ordered {
            text.push(' ');
            text.push_str(ORDERING);
        }
        if let PageLimit::Bounded(n) = limit {
            let p = binder.bind(n as i64);
            text.push_str(&format!(" LIMIT {}", p));
        }
        if offset > 0 {
            let offset = i64::try_from(offset).map_err(|_| QueryError::invalid("offset out of range"))?;
            let p = binder.bind(offset);
            text.push_str(&format!(" OFFSET {}", p));
        }

        tracing::debug!(
            table = %filter.table,
            mode = filter.criteria.mode_name(),
            params = binder.values.len(),
            "Built variant query"
        );
        Ok(GeneratedQuery {
            text,
            params: binder.values,
        })
    }
}
