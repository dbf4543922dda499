//! Prometheus metrics recording and background collection.

use crate::reference::SharedReference;
use crate::store::postgres::PoolStats;
use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Records HTTP request metrics.
pub fn record_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Records one executed search query.
///
/// `kind` is `count`, `page` or `export`; `outcome` is `ok`, `timeout` or `error`.
pub fn record_query(kind: &str, table: &str, outcome: &str, duration: Duration) {
    let labels = [
        ("kind", kind.to_string()),
        ("table", table.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!("snpwizard_queries_total", &labels).increment(1);
    histogram!("snpwizard_query_duration_seconds", &labels).record(duration.as_secs_f64());
    if outcome == "timeout" {
        counter!(
            "snpwizard_query_timeouts_total",
            "kind" => kind.to_string(),
            "table" => table.to_string()
        )
        .increment(1);
    }
}

/// Updates reference-data gauges.
pub fn update_reference_metrics(reference: &SharedReference) {
    let data = reference.current();
    gauge!("snpwizard_strains_total").set(data.strains.names().len() as f64);
    gauge!("snpwizard_consequences_total").set(data.consequences.len() as f64);
    for (table, catalog) in &data.tables {
        let labels = [("table", table.as_str().to_string())];
        gauge!("snpwizard_symbols_total", &labels).set(catalog.symbols.len() as f64);
    }
}

/// Updates connection pool gauges.
pub fn update_pool_metrics(stats: PoolStats) {
    gauge!("snpwizard_pool_connections").set(stats.size as f64);
    gauge!("snpwizard_pool_idle_connections").set(stats.idle as f64);
}
