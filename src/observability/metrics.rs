//! Metrics collection and exposition.
//!
//! # Metrics
//! - `routekit_requests_total` (counter): requests by method, status, route
//! - `routekit_request_duration_seconds` (histogram): latency by route
//! - `routekit_panics_total` (counter): handler panics caught by the pipeline
//! - `routekit_handler_invocations_total` (counter): analytics events by route
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exporter serves its own HTTP listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    ::metrics::describe_counter!(
        "routekit_requests_total",
        "Requests served, by method, status and route"
    );
    ::metrics::describe_histogram!(
        "routekit_request_duration_seconds",
        ::metrics::Unit::Seconds,
        "Time spent in the full request pipeline"
    );
    ::metrics::describe_counter!(
        "routekit_panics_total",
        "Handler panics recovered by the pipeline"
    );

    tracing::info!(address = %addr, "Prometheus metrics endpoint listening");
    Ok(())
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, route: &str, start: Instant) {
    ::metrics::counter!(
        "routekit_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "route" => route.to_string()
    )
    .increment(1);

    ::metrics::histogram!("routekit_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_panic() {
    ::metrics::counter!("routekit_panics_total").increment(1);
}

pub fn record_invocation(route: &str, method: &str, status: u16, authenticated: bool) {
    ::metrics::counter!(
        "routekit_handler_invocations_total",
        "route" => route.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string(),
        "authenticated" => authenticated.to_string()
    )
    .increment(1);
}
