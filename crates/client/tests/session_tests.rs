use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use snpwizard_client::{ClientError, FilterChange, SearchClient, SearchSession};
use snpwizard_core::filter::FilterParams;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Pairs = Vec<(String, String)>;

const SLOW_PAGE: Duration = Duration::from_millis(300);

// ── Mock service ──

#[derive(Clone, Default)]
struct Mock {
    total: usize,
    counts: Arc<Mutex<Vec<Pairs>>>,
    pages: Arc<Mutex<Vec<(u64, i64)>>>,
}

fn param(pairs: &Pairs, key: &str) -> Option<String> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
}

async fn count(State(mock): State<Mock>, Query(pairs): Query<Pairs>) -> Response {
    mock.counts.lock().unwrap().push(pairs.clone());
    if param(&pairs, "symbol").as_deref() == Some("slow") {
        return (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({ "error": "Query Timeout" })),
        )
            .into_response();
    }
    if param(&pairs, "symbol").as_deref() == Some("broken") {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal Server Error" })),
        )
            .into_response();
    }
    let total = mock.total.min(1001);
    Json(json!({ "count": total, "capped": total > 1000 })).into_response()
}

async fn load_more(State(mock): State<Mock>, Query(pairs): Query<Pairs>) -> Response {
    let limit: i64 = param(&pairs, "limit").and_then(|v| v.parse().ok()).unwrap_or(10_000);
    let offset: u64 = param(&pairs, "offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    mock.pages.lock().unwrap().push((offset, limit));

    if param(&pairs, "symbol").as_deref() == Some("slow") {
        tokio::time::sleep(SLOW_PAGE).await;
        let rows: Vec<Value> = (0..3).map(|i| json!([-1 - i])).collect();
        return Json(json!({ "columns": ["pos"], "rows": rows })).into_response();
    }

    let remaining = mock.total.saturating_sub(offset as usize);
    let n = if limit < 0 {
        remaining
    } else {
        remaining.min(limit as usize)
    };
    let rows: Vec<Value> = (0..n).map(|i| json!([offset as usize + i])).collect();
    (
        [("x-response-time", "12")],
        Json(json!({ "columns": ["pos"], "rows": rows })),
    )
        .into_response()
}

async fn spawn_mock(total: usize) -> (String, Mock) {
    let mock = Mock {
        total,
        ..Default::default()
    };
    let app = Router::new()
        .route("/count", get(count))
        .route("/loadMore", get(load_more))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), mock)
}

fn session(base_url: &str) -> SearchSession {
    SearchSession::with_debounce(SearchClient::new(base_url).unwrap(), Duration::ZERO)
}

fn filter(symbol: &str, limit: &str) -> FilterParams {
    [
        ("table", "grcm39_snps"),
        ("searchBy", "symbol"),
        ("symbol", symbol),
        ("consequences", "0,3"),
        ("limit", limit),
    ]
    .into_iter()
    .collect()
}

// ── Paging ──

#[tokio::test]
async fn pages_advance_until_short_page() {
    let (base_url, mock) = spawn_mock(25).await;
    let mut session = session(&base_url);
    assert_eq!(session.set_filter(filter("Pax6", "10")), FilterChange::Restarted);

    let first = session.next_page().await.unwrap().unwrap();
    assert_eq!(first.rows.len(), 10);
    assert_eq!(first.columns, vec!["pos"]);
    assert_eq!(first.server_time, Some(Duration::from_millis(12)));
    assert!(session.has_more());

    let second = session.next_page().await.unwrap().unwrap();
    assert_eq!(second.rows[0], json!([10]));

    let third = session.next_page().await.unwrap().unwrap();
    assert_eq!(third.rows.len(), 5);
    assert!(!session.has_more());

    assert!(session.next_page().await.unwrap().is_none());
    assert_eq!(*mock.pages.lock().unwrap(), vec![(0, 10), (10, 10), (20, 10)]);
}

#[tokio::test]
async fn exact_multiple_needs_one_empty_page() {
    let (base_url, mock) = spawn_mock(20).await;
    let mut session = session(&base_url);
    session.set_filter(filter("Pax6", "10"));

    assert_eq!(session.next_page().await.unwrap().unwrap().rows.len(), 10);
    assert_eq!(session.next_page().await.unwrap().unwrap().rows.len(), 10);
    assert!(session.has_more());
    assert!(session.next_page().await.unwrap().unwrap().rows.is_empty());
    assert!(!session.has_more());
    assert_eq!(mock.pages.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn only_one_page_request_outstanding() {
    let (base_url, mock) = spawn_mock(25).await;
    let mut session = session(&base_url);
    session.set_filter(filter("Pax6", "10"));

    assert!(session.request_page());
    assert!(!session.request_page());
    session.next_page().await.unwrap();
    assert_eq!(mock.pages.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn load_all_fetches_the_rest_unbounded() {
    let (base_url, mock) = spawn_mock(25).await;
    let mut session = session(&base_url);
    session.set_filter(filter("Pax6", "10"));

    session.next_page().await.unwrap();
    let rest = session.load_all().await.unwrap().unwrap();
    assert_eq!(rest.rows.len(), 15);
    assert!(!session.has_more());
    assert_eq!(*mock.pages.lock().unwrap(), vec![(0, 10), (10, -1)]);
}

// ── Filter changes ──

#[tokio::test]
async fn identical_filter_is_a_no_op() {
    let (base_url, mock) = spawn_mock(5).await;
    let mut session = session(&base_url);

    assert_eq!(session.set_filter(filter("Pax6", "10")), FilterChange::Restarted);
    let count = session.count().await.unwrap();
    assert_eq!(count.count, 5);
    assert!(!count.capped);

    assert_eq!(session.set_filter(filter("Pax6", "10")), FilterChange::Unchanged);
    assert_eq!(session.set_filter(filter("Pax6", "20")), FilterChange::Restarted);
    session.count().await.unwrap();
    assert_eq!(mock.counts.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn filter_change_resets_paging() {
    let (base_url, mock) = spawn_mock(25).await;
    let mut session = session(&base_url);
    session.set_filter(filter("Pax6", "10"));
    session.next_page().await.unwrap();
    assert_eq!(session.pager().offset(), 10);

    session.set_filter(filter("Sox2", "10"));
    assert_eq!(session.pager().offset(), 0);
    session.next_page().await.unwrap();
    assert_eq!(mock.pages.lock().unwrap().last(), Some(&(0, 10)));
}

#[tokio::test]
async fn filter_change_drops_page_in_flight() {
    let (base_url, mock) = spawn_mock(25).await;
    let mut session = session(&base_url);
    session.set_filter(filter("slow", "10"));
    assert!(session.request_page());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while mock.pages.lock().unwrap().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "page request never arrived");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert_eq!(session.set_filter(filter("Sox2", "10")), FilterChange::Restarted);
    assert!(!session.pager().is_in_flight());
    assert_eq!(session.pager().offset(), 0);

    let page = session.next_page().await.unwrap().unwrap();
    assert_eq!(page.rows.len(), 10);
    assert_eq!(page.rows[0], json!([0]));
    assert_eq!(session.pager().offset(), 10);
    assert!(session.has_more());

    tokio::time::sleep(SLOW_PAGE * 2).await;
    assert_eq!(session.pager().offset(), 10);
    assert!(session.has_more());
    assert!(!session.pager().is_in_flight());

    let next = session.next_page().await.unwrap().unwrap();
    assert_eq!(next.rows[0], json!([10]));
    assert_eq!(*mock.pages.lock().unwrap(), vec![(0, 10), (0, 10), (10, 10)]);
}

#[tokio::test]
async fn rapid_changes_send_one_debounced_count() {
    let (base_url, mock) = spawn_mock(3).await;
    let mut session =
        SearchSession::with_debounce(SearchClient::new(&base_url).unwrap(), Duration::from_millis(100));

    session.set_filter(filter("P", "10"));
    session.set_filter(filter("Pa", "10"));
    session.set_filter(filter("Pax6", "10"));
    session.count().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let counts = mock.counts.lock().unwrap();
    assert_eq!(counts.len(), 1);
    assert_eq!(param(&counts[0], "symbol").as_deref(), Some("Pax6"));
    assert_eq!(param(&counts[0], "limit"), None);
}

#[tokio::test]
async fn superseded_count_is_cancelled() {
    let (base_url, _mock) = spawn_mock(3).await;
    let mut session =
        SearchSession::with_debounce(SearchClient::new(&base_url).unwrap(), Duration::from_millis(50));

    session.set_filter(filter("Pax6", "10"));
    session.cancel();
    assert!(matches!(session.count().await, Err(ClientError::Cancelled)));
}

// ── Errors ──

#[tokio::test]
async fn count_timeout_is_reported_distinctly() {
    let (base_url, _mock) = spawn_mock(0).await;
    let mut session = session(&base_url);

    session.set_filter(filter("slow", "10"));
    assert!(matches!(session.count().await, Err(ClientError::QueryTimeout)));

    session.set_filter(filter("broken", "10"));
    match session.count().await {
        Err(ClientError::Server { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal Server Error");
        }
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn count_above_cap_is_flagged() {
    let (base_url, _mock) = spawn_mock(50_000).await;
    let client = SearchClient::new(&base_url).unwrap();

    let count = client.count(&filter("Pax6", "10")).await.unwrap();
    assert_eq!(count.count, 1001);
    assert!(count.capped);
}
