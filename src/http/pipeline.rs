//! Middleware pipeline builder.
//!
//! Composes the fixed stage order around one terminal `Endpoint` and boxes
//! the result so the dispatcher can hold pipelines of a single type.

use std::convert::Infallible;

use axum::{extract::Request, middleware::from_fn_with_state, response::Response};
use tower::{util::BoxCloneSyncService, ServiceBuilder};
use tower_http::catch_panic::CatchPanicLayer;

use crate::http::handler::Endpoint;
use crate::http::middleware::{
    access_log::access_log_middleware, analytics::analytics_middleware,
    auth::authenticate_middleware, cors::cors_middleware,
    csrf::{csrf_enforce_middleware, csrf_issue_middleware},
    panic::panic_response,
    precondition::require_store_middleware,
    transport::transport_security_middleware,
    StageContext,
};

/// A fully composed, type-erased request pipeline.
pub type Pipeline = BoxCloneSyncService<Request, Response, Infallible>;

/// Full pipeline for a business endpoint.
pub fn build_pipeline(ctx: StageContext, endpoint: Endpoint) -> Pipeline {
    let service = ServiceBuilder::new()
        .layer(from_fn_with_state(ctx.clone(), access_log_middleware))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(ctx.clone(), transport_security_middleware))
        .layer(from_fn_with_state(ctx.clone(), csrf_issue_middleware))
        .layer(from_fn_with_state(ctx.clone(), require_store_middleware))
        .layer(from_fn_with_state(ctx.clone(), authenticate_middleware))
        .layer(from_fn_with_state(ctx.clone(), cors_middleware))
        .layer(from_fn_with_state(ctx.clone(), csrf_enforce_middleware))
        .layer(from_fn_with_state(ctx, analytics_middleware))
        .service(endpoint);

    BoxCloneSyncService::new(service)
}

/// Pipeline for a synthesized `OPTIONS` handler.
///
/// Preflight requests carry no credentials or CSRF token, so only logging,
/// panic isolation and CORS apply.
pub fn build_preflight_pipeline(ctx: StageContext, endpoint: Endpoint) -> Pipeline {
    let service = ServiceBuilder::new()
        .layer(from_fn_with_state(ctx.clone(), access_log_middleware))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(ctx, cors_middleware))
        .service(endpoint);

    BoxCloneSyncService::new(service)
}
