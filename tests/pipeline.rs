//! Middleware pipeline behavior through a compiled router.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};

use routekit::config::ServerConfig;
use routekit::error::ErrorEnvelope;
use routekit::http::{handler, json_list_result, Endpoint, Paginated};
use routekit::pagination::{paginate, MemoryQuery, PaginationRequest};
use routekit::routing::{Route, RouteMethod, RouteTable, RouterCompiler, Verb};
use routekit::security::{user_identity, X_CSRF_TOKEN};
use routekit::store::MemoryStore;

type HttpRequest = axum::http::Request<axum::body::Body>;

mod common;
use common::{body_json, body_text, request, send, RecordingTelemetry};

async fn explode(_req: Request) -> Result<Response, ErrorEnvelope> {
    panic!("handler exploded")
}

fn whoami() -> Endpoint {
    handler(|req: Request| {
        let subject = user_identity(&req).map(|identity| identity.subject.clone());
        async move { subject.map(IntoResponse::into_response) }
    })
}

fn anonymous_or_subject() -> Endpoint {
    handler(|req: Request| {
        let who = user_identity(&req)
            .map(|identity| identity.subject.clone())
            .unwrap_or_else(|_| "anonymous".to_string());
        async move { Ok(who.into_response()) }
    })
}

fn numbers() -> Endpoint {
    json_list_result(|req: Request| {
        let page = PaginationRequest::from_request(&req);
        async move {
            let page = page?;
            let query = MemoryQuery::new((1..=5).collect::<Vec<u32>>());
            let (items, result) = match paginate(&query, &page).await {
                Ok(found) => found,
                Err(never) => match never {},
            };
            Ok::<_, ErrorEnvelope>(Paginated::new(items, result))
        }
    })
}

struct Harness {
    router: Router,
    hits: Arc<AtomicUsize>,
    telemetry: Arc<RecordingTelemetry>,
    store: Arc<MemoryStore<u32>>,
}

fn harness(config: ServerConfig) -> Harness {
    let hits = Arc::new(AtomicUsize::new(0));
    let routes = vec![
        Route::new("boom", "/boom")
            .method(RouteMethod::new(Verb::Get, "").format("", handler(explode))),
        Route::new("things", "/things")
            .method(RouteMethod::new(Verb::Get, "").format("", common::counting(hits.clone())))
            .secure_method(
                RouteMethod::new(Verb::Post, "").format("", common::counting(hits.clone())),
            ),
        Route::new("me", "/me")
            .method(RouteMethod::new(Verb::Get, "").format("", anonymous_or_subject()))
            .secure_method(RouteMethod::new(Verb::Put, "").format("", whoami())),
        Route::new("numbers", "/numbers")
            .method(RouteMethod::new(Verb::Get, "").format("", numbers())),
        Route::new("hook", "/hook")
            .method(RouteMethod::new(Verb::Post, "").format("", common::counting(hits.clone())))
            .csrf_exempt(),
    ];

    let telemetry = Arc::new(RecordingTelemetry::default());
    let store = MemoryStore::new(vec![1u32]);
    let router = RouterCompiler::new(RouteTable::new(routes).unwrap(), config)
        .with_store(store.clone())
        .with_telemetry(telemetry.clone())
        .compile()
        .unwrap()
        .into_router();

    Harness {
        router,
        hits,
        telemetry,
        store,
    }
}

fn with_bearer(mut req: HttpRequest, token: &str) -> HttpRequest {
    req.headers_mut().insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    req
}

#[tokio::test]
async fn test_panic_becomes_single_500_with_one_access_log() {
    let capture = common::LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let h = harness(common::dev_config());
    let response = send(&h.router, request(Method::GET, "/boom")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["errcode"], 100010);
    assert!(!body.to_string().contains("exploded"));

    let logs = capture.contents();
    assert_eq!(logs.matches("Request completed").count(), 1);
    let line = logs
        .lines()
        .find(|line| line.contains("Request completed"))
        .unwrap();
    assert!(line.contains("route=boom"));
    assert!(line.contains("status=500"));
    assert!(line.contains("elapsed="));
}

#[tokio::test]
async fn test_router_keeps_serving_after_panic() {
    let h = harness(common::dev_config());
    let _ = send(&h.router, request(Method::GET, "/boom")).await;
    let response = send(&h.router, request(Method::GET, "/things")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_secure_method_without_credentials_is_401() {
    let h = harness(common::dev_config());
    let response = send(&h.router, request(Method::POST, "/things")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    assert_eq!(body_json(response).await["errcode"], 4002);
    assert_eq!(h.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_secure_method_with_bad_token_is_403() {
    let h = harness(common::dev_config());
    let req = with_bearer(request(Method::PUT, "/me"), "not.a.jwt");
    let response = send(&h.router, req).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["errcode"], 4001);
}

#[tokio::test]
async fn test_secure_method_with_valid_token() {
    let h = harness(common::dev_config());
    let req = with_bearer(request(Method::PUT, "/me"), &common::token_for("alice"));
    let response = send(&h.router, req).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "alice");
}

#[tokio::test]
async fn test_optional_auth_ignores_bad_credentials() {
    let h = harness(common::dev_config());

    let anonymous = send(&h.router, request(Method::GET, "/me")).await;
    assert_eq!(body_text(anonymous).await, "anonymous");

    let garbage = send(&h.router, with_bearer(request(Method::GET, "/me"), "garbage")).await;
    assert_eq!(garbage.status(), StatusCode::OK);
    assert_eq!(body_text(garbage).await, "anonymous");

    let valid = with_bearer(request(Method::GET, "/me"), &common::token_for("bob"));
    assert_eq!(body_text(send(&h.router, valid).await).await, "bob");
}

#[tokio::test]
async fn test_secure_route_without_verifier() {
    let mut config = common::dev_config();
    config.auth.hmac_secret = None;
    let h = harness(config);

    let missing = send(&h.router, request(Method::PUT, "/me")).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let present = with_bearer(request(Method::PUT, "/me"), &common::token_for("alice"));
    let response = send(&h.router, present).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_store_unavailable_is_503() {
    let h = harness(common::dev_config());
    h.store.set_available(false);

    let response = send(&h.router, request(Method::GET, "/things")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["errcode"], 1000);
    assert_eq!(h.hits.load(Ordering::SeqCst), 0);

    h.store.set_available(true);
    let response = send(&h.router, request(Method::GET, "/things")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.hits.load(Ordering::SeqCst), 1);
}

fn csrf_config() -> ServerConfig {
    let mut config = common::dev_config();
    config.security.csrf_key = Some(common::CSRF_KEY.to_string());
    config
}

/// The `X-CSRF-Token` value and the `name=value` pair of the cookie it is bound to.
fn issued_credentials(response: &Response) -> (String, String) {
    let token = response.headers()[X_CSRF_TOKEN].to_str().unwrap().to_string();
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    (token, cookie)
}

fn with_csrf(mut req: HttpRequest, token: &str, cookie: Option<&str>) -> HttpRequest {
    req.headers_mut()
        .insert(X_CSRF_TOKEN, HeaderValue::from_str(token).unwrap());
    if let Some(cookie) = cookie {
        req.headers_mut()
            .insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
    }
    req
}

#[tokio::test]
async fn test_csrf_issue_and_enforce() {
    let h = harness(csrf_config());
    let bearer = common::token_for("alice");

    let issued = send(&h.router, request(Method::GET, "/things")).await;
    let (token, cookie) = issued_credentials(&issued);
    assert!(cookie.starts_with("_csrf="));

    let missing = send(&h.router, with_bearer(request(Method::POST, "/things"), &bearer)).await;
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(missing).await["errcode"], 4003);
    assert_eq!(h.hits.load(Ordering::SeqCst), 1);

    let req = with_csrf(
        with_bearer(request(Method::POST, "/things"), &bearer),
        &token,
        Some(&cookie),
    );
    let accepted = send(&h.router, req).await;
    assert_eq!(accepted.status(), StatusCode::OK);
    assert!(accepted.headers().get(X_CSRF_TOKEN).is_none());
    assert_eq!(h.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_csrf_token_replayed_by_another_client_is_rejected() {
    let h = harness(csrf_config());
    let bearer = common::token_for("mallory");

    let victim = send(&h.router, request(Method::GET, "/things")).await;
    let (token, _) = issued_credentials(&victim);
    let other = send(&h.router, request(Method::GET, "/things")).await;
    let (_, other_cookie) = issued_credentials(&other);

    let without_cookie = with_csrf(
        with_bearer(request(Method::POST, "/things"), &bearer),
        &token,
        None,
    );
    let response = send(&h.router, without_cookie).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["errcode"], 4003);

    let wrong_cookie = with_csrf(
        with_bearer(request(Method::POST, "/things"), &bearer),
        &token,
        Some(&other_cookie),
    );
    let response = send(&h.router, wrong_cookie).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(h.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_csrf_cookie_is_reused() {
    let h = harness(csrf_config());

    let first = send(&h.router, request(Method::GET, "/things")).await;
    let (first_token, cookie) = issued_credentials(&first);

    let mut again = request(Method::GET, "/things");
    again
        .headers_mut()
        .insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());
    let second = send(&h.router, again).await;
    assert!(second.headers().get(header::SET_COOKIE).is_none());
    let second_token = second.headers()[X_CSRF_TOKEN].to_str().unwrap().to_string();
    assert_ne!(first_token, second_token);

    let req = with_csrf(
        with_bearer(request(Method::POST, "/things"), &common::token_for("alice")),
        &second_token,
        Some(&cookie),
    );
    assert_eq!(send(&h.router, req).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_csrf_exempt_route() {
    let h = harness(csrf_config());

    let response = send(&h.router, request(Method::POST, "/hook")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_response_headers_on_success() {
    let h = harness(common::dev_config());
    let response = send(&h.router, request(Method::GET, "/things")).await;

    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_plain_http_redirects_outside_development() {
    let mut config = common::dev_config();
    config.security.is_development = false;
    let h = harness(config);

    let mut req = request(Method::GET, "/things?page=2");
    req.headers_mut()
        .insert(header::HOST, HeaderValue::from_static("api.example.com"));
    let response = send(&h.router, req).await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://api.example.com/things?page=2"
    );
    assert_eq!(h.hits.load(Ordering::SeqCst), 0);

    let mut req = request(Method::GET, "/things");
    req.headers_mut()
        .insert("x-forwarded-proto", HeaderValue::from_static("https"));
    let response = send(&h.router, req).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_analytics_event_after_handler() {
    let h = harness(common::dev_config());
    let req = with_bearer(request(Method::PUT, "/me"), &common::token_for("carol"));
    let _ = send(&h.router, req).await;

    let events = h.telemetry.wait_for(1).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].route, "me");
    assert_eq!(events[0].method, "PUT");
    assert_eq!(events[0].status, 200);
    assert_eq!(events[0].subject.as_deref(), Some("carol"));
}

#[tokio::test]
async fn test_rejected_request_emits_no_analytics() {
    let h = harness(common::dev_config());
    let _ = send(&h.router, request(Method::POST, "/things")).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(h.telemetry.events().is_empty());
}

#[tokio::test]
async fn test_paginated_list() {
    let h = harness(common::dev_config());
    let response = send(&h.router, request(Method::GET, "/numbers?page=1&per_page=2")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-total-count"], "5");
    assert_eq!(
        response.headers()[header::LINK],
        "</numbers?page=2&per_page=2>; rel=\"next\", </numbers?page=3&per_page=2>; rel=\"last\""
    );
    assert_eq!(body_json(response).await, serde_json::json!([1, 2]));
}

#[tokio::test]
async fn test_invalid_pagination_is_400() {
    let h = harness(common::dev_config());
    let response = send(&h.router, request(Method::GET, "/numbers?page=0")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errcode"], 3012);
    assert_eq!(body["msg"], "Invalid pagination request: page");
}

#[tokio::test]
async fn test_page_past_the_end_is_empty_array() {
    let h = harness(common::dev_config());
    let response = send(&h.router, request(Method::GET, "/numbers?page=9&per_page=2")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "[]");
}
