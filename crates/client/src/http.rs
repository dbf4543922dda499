//! Typed HTTP client for the search service.

use crate::error::ClientError;
use crate::pager::PageCursor;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use snpwizard_core::config;
use snpwizard_core::filter::FilterParams;
use snpwizard_core::wire::{
    CountResponse, ErrorResponse, PageResponse, ReferenceResponse, SymbolsResponse,
    QUERY_TIMEOUT_MESSAGE, RESPONSE_TIME_HEADER,
};
use std::time::Duration;

/// One page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    /// Query duration measured by the server, when reported.
    pub server_time: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    page_timeout: Duration,
}

impl SearchClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_page_timeout(
            base_url,
            Duration::from_secs(config::DEFAULT_PAGE_TRANSPORT_TIMEOUT_SECS),
        )
    }

    /// `page_timeout` bounds page and export transfers; count requests rely on
    /// the server's statement timeout.
    pub fn with_page_timeout(
        base_url: impl Into<String>,
        page_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().gzip(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            page_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /count`
    pub async fn count(&self, params: &FilterParams) -> Result<CountResponse, ClientError> {
        let pairs: Vec<(&str, &str)> = params
            .pairs()
            .filter(|(k, _)| *k != "limit" && *k != "offset")
            .collect();
        let response = self.http.get(self.url("/count")).query(&pairs).send().await?;
        decode(response).await
    }

    /// `GET /loadMore` at the given cursor.
    pub async fn page(&self, params: &FilterParams, cursor: PageCursor) -> Result<Page, ClientError> {
        let mut params = params.clone();
        params.set("limit", cursor.limit.to_param().to_string());
        params.set("offset", cursor.offset.to_string());
        let pairs: Vec<(&str, &str)> = params.pairs().collect();

        let response = self
            .http
            .get(self.url("/loadMore"))
            .query(&pairs)
            .timeout(self.page_timeout)
            .send()
            .await?;
        let server_time = response
            .headers()
            .get(RESPONSE_TIME_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis);
        let body: PageResponse = decode(response).await?;
        tracing::debug!(
            offset = cursor.offset,
            rows = body.rows.len(),
            server_ms = server_time.map(|d| d.as_millis() as u64),
            "Page received"
        );
        Ok(Page {
            columns: body.columns,
            rows: body.rows,
            server_time,
        })
    }

    /// `GET /symbols`
    pub async fn symbols(&self) -> Result<SymbolsResponse, ClientError> {
        let response = self.http.get(self.url("/symbols")).send().await?;
        decode(response).await
    }

    /// `GET /reference`
    pub async fn reference(&self) -> Result<ReferenceResponse, ClientError> {
        let response = self.http.get(self.url("/reference")).send().await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()));
    }
    let message = response
        .json::<ErrorResponse>()
        .await
        .map(|e| e.error)
        .unwrap_or_else(|_| status.to_string());
    if status == StatusCode::GATEWAY_TIMEOUT || message == QUERY_TIMEOUT_MESSAGE {
        return Err(ClientError::QueryTimeout);
    }
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}
