//! Metrics collection.
//!
//! # Metrics
//! - `wallet_sign_requests_total` (counter): signing operations by backend and outcome
//! - `wallet_sign_duration_seconds` (histogram): signing latency by backend
//! - `wallet_retries_total` (counter): transient-failure retries by operation
//! - `wallet_payload_downgrades_total` (counter): structured payloads sent as unsafe
//! - `wallet_activity_dropped_total` (counter): malformed feed items by feed
//! - `wallet_activity_replaced_total` (counter): pending placeholders replaced
//! - `wallet_draft_cache_total` (counter): draft cache lookups by result
//!
//! No exporter is installed here; the embedding application picks one.

use std::time::Instant;

pub fn record_sign_request(backend: &'static str, outcome: &'static str, started: Instant) {
    metrics::counter!("wallet_sign_requests_total", "backend" => backend, "outcome" => outcome).increment(1);
    metrics::histogram!("wallet_sign_duration_seconds", "backend" => backend)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_retry(op: &'static str) {
    metrics::counter!("wallet_retries_total", "op" => op).increment(1);
}

pub fn record_payload_downgrade(kind: &'static str) {
    metrics::counter!("wallet_payload_downgrades_total", "kind" => kind).increment(1);
}

pub fn record_activity_dropped(feed: &str) {
    metrics::counter!("wallet_activity_dropped_total", "feed" => feed.to_string()).increment(1);
}

pub fn record_activity_replaced(count: usize) {
    metrics::counter!("wallet_activity_replaced_total").increment(count as u64);
}

pub fn record_draft_cache(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("wallet_draft_cache_total", "result" => result).increment(1);
}
