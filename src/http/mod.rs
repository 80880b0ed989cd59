//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum::serve, graceful shutdown)
//!     → routing::router (dispatch by path and verb)
//!     → pipeline.rs (middleware stages, in fixed order)
//!     → handler.rs (terminal Endpoint)
//!     → result.rs (typed value → JSON or protobuf body)
//!     → Send to client
//! ```

pub mod handler;
pub mod middleware;
pub mod pipeline;
pub mod result;
pub mod server;

use axum::http::HeaderName;

/// Correlation header set on the way in and echoed on the way out.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub use handler::{handler, Endpoint};
pub use result::{json_list_result, json_result, proto_result, ListPayload, Paginated};
pub use server::HttpServer;
