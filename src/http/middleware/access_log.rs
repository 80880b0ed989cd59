//! Access logging, the outermost stage.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::http::middleware::StageContext;
use crate::http::X_REQUEST_ID;
use crate::observability::metrics;

pub async fn access_log_middleware(
    State(ctx): State<StageContext>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let response = next.run(request).await;
    let status = response.status().as_u16();

    tracing::info!(
        target: "routekit::access",
        method = %method,
        uri = %uri,
        route = %ctx.route.name,
        status,
        elapsed = ?start.elapsed(),
        request_id = %request_id,
        "Request completed"
    );
    metrics::record_request(method.as_str(), status, &ctx.route.name, start);

    response
}
