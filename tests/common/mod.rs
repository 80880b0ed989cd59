//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    response::{IntoResponse, Response},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use tower::ServiceExt;

use routekit::config::ServerConfig;
use routekit::http::{handler, Endpoint};
use routekit::observability::{TelemetryError, TelemetryEvent, TelemetrySink};

pub const JWT_SECRET: &str = "integration-secret";
pub const CSRF_KEY: &str = "integration-csrf-key";

/// Config suitable for plain-HTTP tests: no redirect, no metrics listener.
pub fn dev_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.security.is_development = true;
    config.auth.hmac_secret = Some(JWT_SECRET.to_string());
    config.observability.metrics_enabled = false;
    config
}

/// HS256 token for `subject`, signed with `JWT_SECRET`.
pub fn token_for(subject: &str) -> String {
    let claims = serde_json::json!({ "sub": subject });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Endpoint answering 200 "ok" and counting its invocations.
pub fn counting(hits: Arc<AtomicUsize>) -> Endpoint {
    handler(move |_req| {
        hits.fetch_add(1, Ordering::SeqCst);
        async { Ok("ok".into_response()) }
    })
}

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Telemetry sink that keeps every event for inspection.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Wait for spawned emissions to land.
    pub async fn wait_for(&self, count: usize) -> Vec<TelemetryEvent> {
        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while self.events.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        self.events()
    }
}

#[async_trait]
impl TelemetrySink for RecordingTelemetry {
    async fn emit(&self, event: TelemetryEvent) -> Result<(), TelemetryError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// In-memory `tracing` writer.
#[derive(Debug, Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
