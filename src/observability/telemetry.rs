//! Analytics telemetry.
//!
//! The analytics stage hands one `TelemetryEvent` per handled request to a
//! `TelemetrySink` on a spawned task. Sinks are best effort: failures are
//! logged by the caller and never reach the client.

use std::time::Duration;

use async_trait::async_trait;

use crate::observability::metrics;

/// What happened on one request that reached its handler.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryEvent {
    pub route: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub elapsed: Duration,
    /// Authenticated subject, if any.
    pub subject: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("telemetry delivery failed: {0}")]
pub struct TelemetryError(pub String);

#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn emit(&self, event: TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Records analytics as Prometheus counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsTelemetry;

#[async_trait]
impl TelemetrySink for MetricsTelemetry {
    async fn emit(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        metrics::record_invocation(
            &event.route,
            &event.method,
            event.status,
            event.subject.is_some(),
        );
        Ok(())
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

#[async_trait]
impl TelemetrySink for NoopTelemetry {
    async fn emit(&self, _event: TelemetryEvent) -> Result<(), TelemetryError> {
        Ok(())
    }
}
