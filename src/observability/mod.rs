//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → access log (logging.rs subscriber, one INFO event)
//!     → metrics.rs (request counter, latency histogram)
//!
//! Requests that reach their handler:
//!     → telemetry.rs (TelemetrySink, spawned, best effort)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the access log and HTTP spans
//! - Telemetry never delays or alters a response

pub mod logging;
pub mod metrics;
pub mod telemetry;

pub use telemetry::{MetricsTelemetry, NoopTelemetry, TelemetryError, TelemetryEvent, TelemetrySink};
