//! CORS response headers.

use axum::{
    extract::{Request, State},
    http::{header, header::InvalidHeaderValue, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::config::CorsConfig;
use crate::http::middleware::StageContext;

/// Pre-encoded `Access-Control-*` headers.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl CorsHeaders {
    pub fn from_config(config: &CorsConfig) -> Result<Self, InvalidHeaderValue> {
        let mut headers = vec![
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_str(&config.allow_methods.join(", "))?,
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_str(&config.allow_headers.join(", "))?,
            ),
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_str(&config.allow_origin)?,
            ),
            (
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                HeaderValue::from_str(&config.expose_headers.join(", "))?,
            ),
        ];
        if config.allow_credentials {
            headers.push((
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            ));
        }
        Ok(Self { headers })
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
    }
}

pub async fn cors_middleware(
    State(ctx): State<StageContext>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    ctx.shared.cors.apply(response.headers_mut());
    response
}
