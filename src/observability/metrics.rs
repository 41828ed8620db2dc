//! Metrics collection and exposition.
//!
//! # Metrics
//! - `matchbox_upstream_requests_total` (counter): attempts by service, outcome
//! - `matchbox_upstream_retries_total` (counter): retries by service
//! - `matchbox_token_refresh_total` (counter): token exchanges by service, result
//! - `matchbox_probe_latency_ms` (histogram): liveness round-trip by service
//! - `matchbox_service_up` (gauge): 1=online, 0=offline/error
//! - `matchbox_governor_truncations_total` (counter): truncated payloads
//!
//! Recording is a no-op until a recorder is installed with [`init_metrics`].

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    ::metrics::describe_counter!(
        "matchbox_upstream_requests_total",
        "Outbound upstream attempts by service and outcome"
    );
    ::metrics::describe_counter!("matchbox_upstream_retries_total", "Retried upstream calls");
    ::metrics::describe_counter!("matchbox_token_refresh_total", "Credential exchanges");
    ::metrics::describe_histogram!("matchbox_probe_latency_ms", "Liveness probe latency");
    ::metrics::describe_gauge!("matchbox_service_up", "1 if the service answered its probe");
    ::metrics::describe_counter!(
        "matchbox_governor_truncations_total",
        "Payloads cut by the response governor"
    );

    tracing::info!(address = %addr, "Prometheus metrics exporter listening");
    Ok(())
}

pub fn record_upstream_request(service: &str, outcome: &str) {
    ::metrics::counter!(
        "matchbox_upstream_requests_total",
        "service" => service.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_retry(service: &str) {
    ::metrics::counter!("matchbox_upstream_retries_total", "service" => service.to_string()).increment(1);
}

pub fn record_token_refresh(service: &str, success: bool) {
    let result = if success { "success" } else { "failure" };
    ::metrics::counter!(
        "matchbox_token_refresh_total",
        "service" => service.to_string(),
        "result" => result
    )
    .increment(1);
}

pub fn record_probe(service: &str, latency_ms: u64) {
    ::metrics::histogram!("matchbox_probe_latency_ms", "service" => service.to_string())
        .record(latency_ms as f64);
}

pub fn record_service_up(service: &str, up: bool) {
    ::metrics::gauge!("matchbox_service_up", "service" => service.to_string())
        .set(if up { 1.0 } else { 0.0 });
}

pub fn record_truncation() {
    ::metrics::counter!("matchbox_governor_truncations_total").increment(1);
}
