//! Transport security: HTTPS redirect and hardening headers.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::SecurityConfig;
use crate::http::middleware::StageContext;

const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
const X_XSS_PROTECTION: HeaderName = HeaderName::from_static("x-xss-protection");

pub async fn transport_security_middleware(
    State(ctx): State<StageContext>,
    request: Request,
    next: Next,
) -> Response {
    let security = &ctx.shared.config.security;

    if security.ssl_redirect && !security.is_development && !is_https(&request) {
        if let Some(location) = https_location(&request) {
            tracing::debug!(location = ?location, "Redirecting to HTTPS");
            return (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response();
        }
    }

    let mut response = next.run(request).await;
    apply_hardening_headers(security, response.headers_mut());
    response
}

fn is_https(request: &Request) -> bool {
    if let Some(proto) = request.headers().get(X_FORWARDED_PROTO) {
        return proto
            .to_str()
            .map(|p| p.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false);
    }
    request.uri().scheme_str() == Some("https")
}

fn https_location(request: &Request) -> Option<HeaderValue> {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))?;
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    HeaderValue::from_str(&format!("https://{host}{path}")).ok()
}

fn apply_hardening_headers(security: &SecurityConfig, headers: &mut HeaderMap) {
    if security.frame_deny {
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    }
    if security.content_type_nosniff {
        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    }
    if security.browser_xss_filter {
        headers.insert(X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    }
    if let Some(csp) = security.content_security_policy.as_deref() {
        match HeaderValue::from_str(csp) {
            Ok(value) => {
                headers.insert(header::CONTENT_SECURITY_POLICY, value);
            }
            Err(e) => tracing::warn!(error = %e, "Invalid Content-Security-Policy value"),
        }
    }
}
