//! PostgreSQL-backed [`VariantStore`] on a sqlx connection pool.
//!
//! Every query runs in its own transaction so `SET LOCAL statement_timeout`
//! is scoped to that one statement; the connection returns to the pool when
//! the transaction is dropped, on every exit path.

use super::{Catalog, RowSet, StoreError, VariantStore};
use async_trait::async_trait;
use serde_json::Value;
use snpwizard_core::config;
use snpwizard_core::query::{GeneratedQuery, SqlValue};
use snpwizard_core::reference::{ConsequenceVocabulary, TableCatalog};
use snpwizard_core::table::VariantTable;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

/// SQLSTATE raised when a statement is cancelled by `statement_timeout`.
const QUERY_CANCELED: &str = "57014";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(QUERY_CANCELED) => {
                StoreError::Timeout
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// Pool statistics exported as gauges.
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    pub size: u32,
    pub idle: usize,
}

#[derive(Clone)]
pub struct PgVariantStore {
    pool: PgPool,
}

impl PgVariantStore {
    /// Connect, retrying with exponential backoff up to `attempts` times.
    pub async fn connect(
        options: PgConnectOptions,
        max_connections: u32,
        attempts: u32,
    ) -> Result<Self, StoreError> {
        let attempts = attempts.max(1);
        let mut delay = Duration::from_millis(config::CONNECT_BACKOFF_INITIAL_MS);
        let max_delay = Duration::from_millis(config::CONNECT_BACKOFF_MAX_MS);
        let mut attempt = 1;
        loop {
            let result = PgPoolOptions::new()
                .max_connections(max_connections)
                .connect_with(options.clone())
                .await;
            match result {
                Ok(pool) => {
                    tracing::info!(attempt, max_connections, "Connected to PostgreSQL");
                    return Ok(Self { pool });
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        "PostgreSQL connection failed: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(max_delay);
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(attempt, "Giving up on PostgreSQL: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle(),
        }
    }

    async fn consequence_vocabulary(&self) -> Result<ConsequenceVocabulary, StoreError> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT consequence FROM consequences ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        let high_impact: Vec<String> =
            sqlx::query_scalar("SELECT consequence FROM consequences WHERE high_impact = true")
                .fetch_all(&self.pool)
                .await?;
        Ok(ConsequenceVocabulary::new(names, high_impact))
    }

    async fn table_catalog(&self, table: VariantTable) -> Result<TableCatalog, StoreError> {
        // Table names come from the closed enum, never from input.
        let consequences: Vec<i32> = sqlx::query_scalar(&format!(
            "SELECT id::int4 FROM consequences WHERE {} > 0 ORDER BY id",
            table.as_str()
        ))
        .fetch_all(&self.pool)
        .await?;
        let symbols: Vec<Option<String>> = sqlx::query_scalar(&format!(
            "SELECT symbol FROM symbols WHERE {} = true ORDER BY symbol",
            table.as_str()
        ))
        .fetch_all(&self.pool)
        .await?;
        let consequences: BTreeSet<usize> = consequences
            .into_iter()
            .filter(|&id| id >= 0)
            .map(|id| id as usize)
            .collect();
        Ok(TableCatalog::new(consequences, symbols.into_iter().flatten()))
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::IntArray(v) => query.bind(v.as_slice()),
        };
    }
    query
}

async fn set_timeout(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    timeout: Option<Duration>,
) -> Result<(), StoreError> {
    if let Some(timeout) = timeout {
        let stmt = format!("SET LOCAL statement_timeout = {}", timeout.as_millis());
        sqlx::query(&stmt).execute(&mut **tx).await?;
    }
    Ok(())
}

/// Convert one cell to JSON by its Postgres type.
fn cell_to_json(row: &PgRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "BOOL" => Value::from(row.try_get::<bool, _>(index)?),
        "INT2" => Value::from(row.try_get::<i16, _>(index)?),
        "INT4" => Value::from(row.try_get::<i32, _>(index)?),
        "INT8" => Value::from(row.try_get::<i64, _>(index)?),
        "FLOAT4" => Value::from(row.try_get::<f32, _>(index)?),
        "FLOAT8" => Value::from(row.try_get::<f64, _>(index)?),
        "INT2[]" => Value::from(row.try_get::<Vec<i16>, _>(index)?),
        "INT4[]" => Value::from(row.try_get::<Vec<i32>, _>(index)?),
        "INT8[]" => Value::from(row.try_get::<Vec<i64>, _>(index)?),
        "TEXT[]" | "VARCHAR[]" => Value::from(row.try_get::<Vec<String>, _>(index)?),
        "JSON" | "JSONB" => row.try_get::<Value, _>(index)?,
        _ => Value::from(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}

#[async_trait]
impl VariantStore for PgVariantStore {
    async fn count(&self, query: &GeneratedQuery, timeout: Option<Duration>) -> Result<u64, StoreError> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;
        set_timeout(&mut tx, timeout).await?;
        let row = bind_all(sqlx::query(&query.text), &query.params)
            .fetch_one(&mut *tx)
            .await?;
        let total: i64 = row.try_get("total")?;
        tx.commit().await?;
        tracing::debug!(total, elapsed_ms = start.elapsed().as_millis() as u64, "count query");
        Ok(total.max(0) as u64)
    }

    async fn fetch(&self, query: &GeneratedQuery, timeout: Option<Duration>) -> Result<RowSet, StoreError> {
        let start = Instant::now();
        let mut tx = self.pool.begin().await?;
        set_timeout(&mut tx, timeout).await?;
        let rows = bind_all(sqlx::query(&query.text), &query.params)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        let columns = rows
            .first()
            .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| cell_to_json(row, i))
                    .collect::<Result<Vec<Value>, _>>()
            })
            .collect::<Result<Vec<Vec<Value>>, sqlx::Error>>()?;
        tracing::debug!(
            rows = rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "page query"
        );
        Ok(RowSet { columns, rows })
    }

    async fn load_catalog(&self) -> Result<Catalog, StoreError> {
        let consequences = self.consequence_vocabulary().await?;
        let mut tables = BTreeMap::new();
        for table in VariantTable::ALL {
            // A missing table column leaves that table without a catalog.
            match self.table_catalog(table).await {
                Ok(catalog) => {
                    tracing::info!(
                        table = %table,
                        consequences = catalog.consequences.len(),
                        symbols = catalog.symbols.len(),
                        "Loaded table catalog"
                    );
                    tables.insert(table, catalog);
                }
                Err(e) => tracing::warn!(table = %table, "Could not load table catalog: {}", e),
            }
        }
        Ok(Catalog {
            consequences,
            tables,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
