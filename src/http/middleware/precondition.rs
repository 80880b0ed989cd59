//! Precondition check: the shared data store must be live.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{ErrorCode, ErrorEnvelope};
use crate::http::middleware::StageContext;

pub async fn require_store_middleware(
    State(ctx): State<StageContext>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(store) = ctx.shared.store.as_ref() {
        if !store.is_available().await {
            return ErrorEnvelope::new(ErrorCode::NoDatabase).into_response();
        }
    }

    next.run(request).await
}
