//! HTTP request handlers and shared application state.

use crate::api::errors::ApiError;
use crate::api::metrics;
use crate::api::models::*;
use crate::reference::{ReferenceSource, SharedReference};
use crate::store::{RowSet, StoreError, VariantStore};
use axum::extract::{Query, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use snpwizard_core::config;
use snpwizard_core::export::{write_csv, write_xlsx, ExportFormat};
use snpwizard_core::filter::{FilterParams, SearchFilter};
use snpwizard_core::query::{GeneratedQuery, Projection, QueryBuilder};
use snpwizard_core::reference::ReferenceData;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared application state passed to every handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VariantStore>,
    pub reference: SharedReference,
    pub reference_source: ReferenceSource,
    pub prometheus_handle: PrometheusHandle,
    /// Statement timeout of count probes.
    pub count_timeout: Option<Duration>,
    /// Statement timeout of page and export queries; `None` runs unbounded.
    pub page_timeout: Option<Duration>,
    /// Key required by `POST /admin/reload`; `None` leaves it open.
    pub admin_key: Option<String>,
    pub start_time: Instant,
}

/// Raw query-string pairs, repeated keys kept in order.
pub type RawParams = Query<Vec<(String, String)>>;

fn outcome<T>(result: &Result<T, StoreError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(StoreError::Timeout) => "timeout",
        Err(_) => "error",
    }
}

/// A validated page query together with the projection it was built from.
struct PageQuery {
    filter: SearchFilter,
    projection: Projection,
    query: GeneratedQuery,
}

fn page_query(params: &FilterParams, reference: &ReferenceData) -> Result<PageQuery, ApiError> {
    let filter = SearchFilter::from_params(params, reference)?;
    let projection = match params.get("columns") {
        Some(columns) => Projection::parse(columns, &reference.strains)?,
        None => Projection::for_strains(&filter.strains),
    };
    let query = QueryBuilder::new(&reference.strains).build(&filter, &projection, true)?;
    Ok(PageQuery {
        filter,
        projection,
        query,
    })
}

/// Column labels of a projection, used when no row came back to carry them.
fn projection_names(projection: &Projection) -> Vec<String> {
    match projection {
        Projection::All => Vec::new(),
        Projection::Columns(columns) => columns.iter().map(|c| c.name().to_string()).collect(),
    }
}

async fn run_page(state: &AppState, kind: &str, page: &PageQuery) -> Result<(RowSet, Duration), ApiError> {
    let start = Instant::now();
    let result = state.store.fetch(&page.query, state.page_timeout).await;
    let elapsed = start.elapsed();
    metrics::record_query(kind, page.filter.table.as_str(), outcome(&result), elapsed);
    let mut rows = result?;
    if rows.columns.is_empty() {
        rows.columns = projection_names(&page.projection);
    }
    Ok((rows, elapsed))
}

/// `GET /count`
pub async fn count(
    State(state): State<AppState>,
    Query(pairs): RawParams,
) -> Result<Json<CountResponse>, ApiError> {
    let reference = state.reference.current();
    let params: FilterParams = pairs.into_iter().collect();
    let filter = SearchFilter::from_params(&params, &reference)?;
    let query = QueryBuilder::new(&reference.strains).build_count(&filter)?;

    let start = Instant::now();
    let result = state.store.count(&query, state.count_timeout).await;
    metrics::record_query("count", filter.table.as_str(), outcome(&result), start.elapsed());
    if matches!(result, Err(StoreError::Timeout)) {
        tracing::warn!(table = %filter.table, mode = filter.criteria.mode_name(), "Count query timed out");
    }
    let count = result?;

    Ok(Json(CountResponse {
        count,
        capped: count > config::COUNT_DISPLAY_CAP,
    }))
}

/// `GET /loadMore`
pub async fn load_more(
    State(state): State<AppState>,
    Query(pairs): RawParams,
) -> Result<Response, ApiError> {
    let reference = state.reference.current();
    let params: FilterParams = pairs.into_iter().collect();
    let page = page_query(&params, &reference)?;
    let (rows, elapsed) = run_page(&state, "page", &page).await?;

    tracing::info!(
        table = %page.filter.table,
        mode = page.filter.criteria.mode_name(),
        offset = page.filter.offset,
        rows = rows.rows.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Page served"
    );

    let mut response = Json(PageResponse {
        columns: rows.columns,
        rows: rows.rows,
    })
    .into_response();
    response.headers_mut().insert(
        HeaderName::from_static(RESPONSE_TIME_HEADER),
        HeaderValue::from(elapsed.as_millis() as u64),
    );
    Ok(response)
}

/// Strip characters that cannot appear in a quoted `filename=` value.
fn attachment_name(name: &str, format: ExportFormat) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() || c == ' ' {
                if c == '"' || c == '\\' {
                    '_'
                } else {
                    c
                }
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim();
    let stem = if cleaned.is_empty() {
        config::DEFAULT_EXPORT_NAME
    } else {
        cleaned
    };
    format!("{}.{}", stem, format.extension())
}

/// `GET /export`
pub async fn export(
    State(state): State<AppState>,
    Query(pairs): RawParams,
) -> Result<Response, ApiError> {
    let reference = state.reference.current();
    let params: FilterParams = pairs.into_iter().collect();
    let format = match params.get("format") {
        Some(text) => ExportFormat::parse(text)?,
        None => ExportFormat::default(),
    };
    let page = page_query(&params, &reference)?;
    let (rows, _) = run_page(&state, "export", &page).await?;

    let mut body = Vec::new();
    let (columns, consequences, strains) = (&rows.columns, &reference.consequences, &reference.strains);
    let written = match format {
        ExportFormat::Csv => write_csv(&mut body, columns, &rows.rows, consequences, strains)?,
        ExportFormat::Xlsx => write_xlsx(&mut body, columns, &rows.rows, consequences, strains)?,
    };
    let file_name = attachment_name(&page.filter.export_name(), format);
    tracing::info!(table = %page.filter.table, rows = written, file = %file_name, "Export served");

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file_name))
        .map_err(|e| ApiError::Internal(format!("invalid export file name: {}", e)))?;
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(format.content_type())),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// `GET /symbols`
pub async fn symbols(State(state): State<AppState>) -> Json<SymbolsResponse> {
    Json(SymbolsResponse {
        symbols: state.reference.current().symbol_maps(),
    })
}

/// `GET /reference`
pub async fn reference(State(state): State<AppState>) -> Json<ReferenceResponse> {
    Json(reference_response(&state.reference.current()))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Health check: database unavailable: {}", e);
            false
        }
    };
    let reference = state.reference.current();
    let status_code = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if database_ok { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
            database: if database_ok { "ok" } else { "unavailable" }.to_string(),
            strains: reference.strains.names().len(),
            consequences: reference.consequences.len(),
            tables: reference.tables.len(),
        }),
    )
}

/// `GET /metrics`
pub async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.prometheus_handle.render()
}

/// `POST /admin/reload`
pub async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let data = state.reference_source.load(state.store.as_ref()).await?;
    let response = ReloadResponse::from_reference(&data);
    state.reference.replace(data);
    metrics::update_reference_metrics(&state.reference);
    tracing::info!(
        consequences = response.consequences,
        strains = response.strains,
        symbols = response.symbols,
        "Reference data reloaded"
    );
    Ok(Json(response))
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound(NOT_FOUND_MESSAGE.to_string())
}
