//! One search form's view of the count and page protocol.
//!
//! A session owns the current filter, its pager, and one slot each for the
//! count and page requests. Changing the filter cancels both, resets paging,
//! and issues a debounced count.

use crate::error::ClientError;
use crate::http::{Page, SearchClient};
use crate::latest::LatestRequest;
use crate::pager::{PageOutcome, Pager};
use snpwizard_core::config;
use snpwizard_core::filter::{FilterParams, PageLimit};
use snpwizard_core::wire::CountResponse;
use std::sync::Arc;
use std::time::Duration;

/// Result of [`SearchSession::set_filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    /// Same parameters as the current search; nothing was sent.
    Unchanged,
    /// A new search started.
    Restarted,
}

/// Encoded form used to detect identical requests. Keys are already sorted
/// by [`FilterParams`]; `%`, `&` and `=` are escaped so the encoding is
/// unambiguous.
fn encode_params(params: &FilterParams) -> String {
    fn escape(text: &str) -> String {
        text.replace('%', "%25").replace('&', "%26").replace('=', "%3D")
    }
    params
        .pairs()
        .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub struct SearchSession {
    client: Arc<SearchClient>,
    debounce: Duration,
    params: FilterParams,
    encoded: Option<String>,
    pager: Pager,
    count: LatestRequest<CountResponse>,
    page: LatestRequest<Page>,
}

impl SearchSession {
    pub fn new(client: SearchClient) -> Self {
        Self::with_debounce(client, Duration::from_millis(config::DEFAULT_DEBOUNCE_MS))
    }

    pub fn with_debounce(client: SearchClient, debounce: Duration) -> Self {
        Self {
            client: Arc::new(client),
            debounce,
            params: FilterParams::new(),
            encoded: None,
            pager: Pager::default(),
            count: LatestRequest::new(),
            page: LatestRequest::new(),
        }
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// False once the terminal page has been applied; load controls should hide.
    pub fn has_more(&self) -> bool {
        !self.pager.is_exhausted()
    }

    /// Replace the filter.
    ///
    /// `limit` and `offset` in `params` are taken over by the pager. Identical
    /// parameters are a no-op; otherwise in-flight requests are cancelled and
    /// a count is issued after the debounce delay.
    pub fn set_filter(&mut self, mut params: FilterParams) -> FilterChange {
        let limit = match params.get("limit") {
            Some(text) => PageLimit::parse(text).unwrap_or_else(|e| {
                tracing::warn!("Ignoring page limit: {}", e);
                PageLimit::default()
            }),
            None => PageLimit::default(),
        };
        params.remove("limit");
        params.remove("offset");

        let encoded = format!("{}&limit={}", encode_params(&params), limit.to_param());
        if self.encoded.as_deref() == Some(encoded.as_str()) {
            return FilterChange::Unchanged;
        }

        self.count.cancel();
        self.page.cancel();
        self.pager = Pager::new(limit);
        self.params = params;
        self.encoded = Some(encoded);

        let client = self.client.clone();
        let count_params = self.params.clone();
        let delay = self.debounce;
        self.count.issue(async move {
            tokio::time::sleep(delay).await;
            client.count(&count_params).await
        });
        FilterChange::Restarted
    }

    /// Await the count of the current filter.
    pub async fn count(&mut self) -> Result<CountResponse, ClientError> {
        self.count.wait().await
    }

    /// Issue the next page request in the background.
    ///
    /// Returns false while a page is outstanding or after the terminal page.
    pub fn request_page(&mut self) -> bool {
        let Some(cursor) = self.pager.next_request() else {
            return false;
        };
        let client = self.client.clone();
        let params = self.params.clone();
        self.page.issue(async move { client.page(&params, cursor).await });
        true
    }

    /// Fetch and apply the next page. `Ok(None)` after the terminal page.
    pub async fn next_page(&mut self) -> Result<Option<Page>, ClientError> {
        if !self.page.is_issued() && !self.request_page() {
            return Ok(None);
        }
        match self.page.wait().await {
            Ok(page) => {
                if let Some(PageOutcome::Finished) = self.pager.apply(page.rows.len()) {
                    tracing::debug!(offset = self.pager.offset(), "Last page applied");
                }
                Ok(Some(page))
            }
            Err(e) => {
                self.pager.abandon();
                Err(e)
            }
        }
    }

    /// Fetch every remaining row in one unbounded request.
    pub async fn load_all(&mut self) -> Result<Option<Page>, ClientError> {
        self.page.cancel();
        self.pager.set_limit(PageLimit::Unbounded);
        self.next_page().await
    }

    /// Cancel both outstanding requests.
    pub fn cancel(&mut self) {
        self.count.cancel();
        if self.page.is_issued() {
            self.page.cancel();
            self.pager.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_is_order_independent_and_unambiguous() {
        let a: FilterParams = [("b", "2"), ("a", "1")].into_iter().collect();
        let b: FilterParams = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(encode_params(&a), encode_params(&b));

        let joined: FilterParams = [("a", "1&b=2")].into_iter().collect();
        let split: FilterParams = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_ne!(encode_params(&joined), encode_params(&split));
    }
}
