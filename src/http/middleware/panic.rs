//! Panic isolation.
//!
//! Used with `tower_http::catch_panic::CatchPanicLayer::custom`, both per
//! pipeline and around the whole router.

use std::any::Any;

use axum::response::{IntoResponse, Response};

use crate::error::{ErrorCode, ErrorEnvelope};
use crate::observability::metrics;

/// Turn a caught panic payload into a generic 500 envelope.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "non-string panic payload".to_string()
    };

    tracing::error!(panic = %detail, "Recovered from panic");
    metrics::record_panic();

    ErrorEnvelope::with_cause(ErrorCode::UnexpectedFailure, detail).into_response()
}
