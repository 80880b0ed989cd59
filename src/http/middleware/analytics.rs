//! Analytics stage: fire-and-forget telemetry after the handler runs.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::http::middleware::StageContext;
use crate::observability::TelemetryEvent;
use crate::security::Identity;

pub async fn analytics_middleware(
    State(ctx): State<StageContext>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let subject = request
        .extensions()
        .get::<Identity>()
        .map(|identity| identity.subject.clone());

    let response = next.run(request).await;

    let event = TelemetryEvent {
        route: ctx.route.name.clone(),
        method,
        path,
        status: response.status().as_u16(),
        elapsed: start.elapsed(),
        subject,
    };
    let sink = ctx.shared.telemetry.clone();
    tokio::spawn(async move {
        if let Err(e) = sink.emit(event).await {
            tracing::warn!(error = %e, "Telemetry emission failed");
        }
    });

    response
}
