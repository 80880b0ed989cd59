//! CSRF token issuance and enforcement stages.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{ErrorCode, ErrorEnvelope};
use crate::http::middleware::StageContext;
use crate::security::csrf::{is_safe_method, X_CSRF_TOKEN};

/// Attach a fresh token to safe requests that did not send one.
///
/// Clients without a valid secret cookie get a new one alongside the token.
pub async fn csrf_issue_middleware(
    State(ctx): State<StageContext>,
    request: Request,
    next: Next,
) -> Response {
    let Some(tokens) = ctx.shared.csrf.as_ref() else {
        return next.run(request).await;
    };

    let issue = is_safe_method(request.method())
        && request
            .headers()
            .get(X_CSRF_TOKEN)
            .map_or(true, |v| v.is_empty());
    let existing = tokens.secret_from(request.headers());

    let mut response = next.run(request).await;
    if !issue {
        return response;
    }

    let (secret, fresh) = match existing {
        Some(secret) => (secret, false),
        None => (tokens.new_secret(), true),
    };
    match HeaderValue::from_str(&tokens.issue(&secret)) {
        Ok(token) => {
            response.headers_mut().insert(X_CSRF_TOKEN, token);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Unable to encode CSRF token header");
            return response;
        }
    }
    if fresh {
        match HeaderValue::from_str(&tokens.cookie(&secret)) {
            Ok(cookie) => {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            Err(e) => tracing::warn!(error = %e, "Unable to encode CSRF cookie"),
        }
    }
    response
}

/// Reject unsafe requests unless the echoed token matches the client's cookie.
pub async fn csrf_enforce_middleware(
    State(ctx): State<StageContext>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(tokens) = ctx.shared.csrf.as_ref() {
        if !ctx.route.csrf_exempt && !is_safe_method(request.method()) {
            let secret = tokens.secret_from(request.headers());
            let token = request
                .headers()
                .get(X_CSRF_TOKEN)
                .and_then(|v| v.to_str().ok());
            let valid = match (secret, token) {
                (Some(secret), Some(token)) => tokens.verify(&secret, token),
                _ => false,
            };
            if !valid {
                tracing::warn!(
                    route = %ctx.route.name,
                    method = %request.method(),
                    "CSRF check failed"
                );
                return ErrorEnvelope::new(ErrorCode::CsrfInvalid).into_response();
            }
        }
    }

    next.run(request).await
}
