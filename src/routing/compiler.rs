//! Router compiler.
//!
//! Turns a validated `RouteTable` plus injected collaborators into a live
//! axum `Router`:
//! - one pipeline per (route, verb, format) at `uri + extension`
//! - one preflight pipeline per concrete path, backed by `PreflightIndex`
//! - request ids, HTTP spans and a last-resort panic barrier around it all

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::header::InvalidHeaderValue, Router};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::handler::{handler, Endpoint};
use crate::http::middleware::{
    panic::panic_response, CorsHeaders, PipelineState, RouteContext, StageContext,
};
use crate::http::pipeline::{build_pipeline, build_preflight_pipeline};
use crate::observability::{MetricsTelemetry, TelemetrySink};
use crate::routing::preflight::{preflight_response, PreflightIndex};
use crate::routing::route::RouteTable;
use crate::routing::router::{dispatch_handler, DispatchEntry, Dispatcher};
use crate::security::{CredentialError, CredentialVerifier, CsrfTokens, JwtVerifier};
use crate::store::DataStore;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("invalid CORS header value: {0}")]
    Cors(#[from] InvalidHeaderValue),

    #[error("invalid CSRF key: {0}")]
    CsrfKey(String),

    #[error("invalid credential key: {0}")]
    Credentials(#[from] CredentialError),
}

/// Builder collecting everything a compiled router needs.
pub struct RouterCompiler {
    table: RouteTable,
    config: Arc<ServerConfig>,
    store: Option<Arc<dyn DataStore>>,
    verifier: Option<Arc<dyn CredentialVerifier>>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl RouterCompiler {
    pub fn new(table: RouteTable, config: ServerConfig) -> Self {
        Self {
            table,
            config: Arc::new(config),
            store: None,
            verifier: None,
            telemetry: Arc::new(MetricsTelemetry),
        }
    }

    /// Store checked by the precondition stage before every handler.
    pub fn with_store(mut self, store: Arc<dyn DataStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the verifier otherwise built from `auth` config.
    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn compile(self) -> Result<CompiledRouter, CompileError> {
        let config = self.config;

        let security = &config.security;
        let csrf = match security.csrf_key.as_deref() {
            Some(key) => Some(
                CsrfTokens::new(key)
                    .map_err(|e| CompileError::CsrfKey(e.to_string()))?
                    .with_cookie_name(security.csrf_cookie_name.as_str())
                    .with_max_age(Duration::from_secs(security.csrf_max_age_secs))
                    .with_secure_cookie(!security.is_development),
            ),
            None => None,
        };
        let verifier = match self.verifier {
            Some(verifier) => Some(verifier),
            None => JwtVerifier::from_config(&config.auth)?
                .map(|v| Arc::new(v) as Arc<dyn CredentialVerifier>),
        };

        let shared = Arc::new(PipelineState {
            cors: CorsHeaders::from_config(&config.cors)?,
            config: config.clone(),
            csrf,
            store: self.store,
            verifier,
            telemetry: self.telemetry,
        });

        let table = Arc::new(self.table);
        let preflight = Arc::new(PreflightIndex::new(&table));
        let options = preflight_endpoint(table.clone(), preflight.clone());

        let mut entries = Vec::with_capacity(table.patterns().len());
        let mut by_path = HashMap::new();
        for rp in table.patterns() {
            let Some(route) = table.get(rp.route) else {
                continue;
            };
            let ctx = stage_context(&shared, &route.name, false, route.csrf_exempt);
            by_path.insert(rp.pattern.path().to_string(), entries.len());
            entries.push(DispatchEntry::new(
                rp.pattern.clone(),
                rp.route,
                build_preflight_pipeline(ctx, options.clone()),
            ));
        }

        for route in table.routes() {
            for endpoint in route.endpoints() {
                let Some(&slot) = by_path.get(&endpoint.path) else {
                    continue;
                };
                let ctx = stage_context(&shared, &route.name, endpoint.secure, route.csrf_exempt);
                entries[slot]
                    .methods
                    .insert(endpoint.verb, build_pipeline(ctx, endpoint.handler.clone()));

                tracing::debug!(
                    route = %route.name,
                    verb = %endpoint.verb,
                    path = %endpoint.path,
                    secure = endpoint.secure,
                    "Registered endpoint"
                );
            }
        }

        tracing::info!(
            routes = table.len(),
            paths = entries.len(),
            csrf = shared.csrf.is_some(),
            "Router compiled"
        );

        Ok(CompiledRouter {
            dispatcher: Arc::new(Dispatcher::new(entries)),
            table,
            preflight,
        })
    }
}

fn stage_context(
    shared: &Arc<PipelineState>,
    name: &str,
    secure: bool,
    csrf_exempt: bool,
) -> StageContext {
    StageContext {
        shared: shared.clone(),
        route: Arc::new(RouteContext {
            name: name.to_string(),
            secure,
            csrf_exempt,
        }),
    }
}

fn preflight_endpoint(table: Arc<RouteTable>, index: Arc<PreflightIndex>) -> Endpoint {
    handler(move |request| {
        let result = preflight_response(&table, &index, request.uri().path());
        async move { result }
    })
}

/// The product of compilation.
pub struct CompiledRouter {
    dispatcher: Arc<Dispatcher>,
    table: Arc<RouteTable>,
    preflight: Arc<PreflightIndex>,
}

impl CompiledRouter {
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn preflight_index(&self) -> &PreflightIndex {
        &self.preflight
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Wrap the dispatcher in the process-level layers.
    pub fn into_router(self) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(self.dispatcher)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(CatchPanicLayer::custom(panic_response)),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler;
    use crate::observability::NoopTelemetry;
    use crate::routing::matcher::PathParams;
    use crate::routing::route::{Route, RouteMethod, Verb};
    use axum::{
        body::Body,
        extract::Request,
        http::{header, Method, StatusCode},
        response::IntoResponse,
    };
    use tower::ServiceExt;

    fn dev_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.security.is_development = true;
        config
    }

    fn table() -> RouteTable {
        let list = handler(|_req| async { Ok("list".into_response()) });
        let get = handler(|req: Request| async move {
            let id = req
                .extensions()
                .get::<PathParams>()
                .and_then(|p| p.get("id"))
                .unwrap_or("?")
                .to_string();
            Ok(id.into_response())
        });
        RouteTable::new(vec![
            Route::new("things", "/things")
                .method(RouteMethod::new(Verb::Get, "List").format("", list)),
            Route::new("thing", "/things/{id}").method(
                RouteMethod::new(Verb::Get, "Get")
                    .format("", get.clone())
                    .format(".json", get),
            ),
        ])
        .unwrap()
    }

    fn router() -> Router {
        RouterCompiler::new(table(), dev_config())
            .with_telemetry(Arc::new(NoopTelemetry))
            .compile()
            .unwrap()
            .into_router()
    }

    async fn send(router: Router, method: Method, uri: &str) -> axum::response::Response {
        let request = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        router.oneshot(request).await.unwrap()
    }

    async fn text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_compile_registers_every_concrete_path() {
        let compiled = RouterCompiler::new(table(), dev_config()).compile().unwrap();
        let mut paths: Vec<_> = compiled.dispatcher().paths().collect();
        paths.sort();
        assert_eq!(paths, vec!["/things", "/things/{id}", "/things/{id}.json"]);
        assert_eq!(compiled.preflight_index().len(), 3);
        assert_eq!(compiled.table().len(), 2);
    }

    #[test]
    fn test_bad_cors_value_fails_compile() {
        let mut config = dev_config();
        config.cors.allow_origin = "bad\nvalue".into();
        let err = RouterCompiler::new(table(), config).compile().err().unwrap();
        assert!(matches!(err, CompileError::Cors(_)));
    }

    #[tokio::test]
    async fn test_request_reaches_handler_with_params() {
        let response = send(router(), Method::GET, "/things/42").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(text(response).await, "42");
    }

    #[tokio::test]
    async fn test_extension_path_is_distinct() {
        let response = send(router(), Method::GET, "/things/7.json").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, "7");
    }

    #[tokio::test]
    async fn test_unknown_verb_is_method_not_allowed() {
        let response = send(router(), Method::DELETE, "/things").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body: serde_json::Value = serde_json::from_str(&text(response).await).unwrap();
        assert_eq!(body["errcode"], 3013);
    }

    #[tokio::test]
    async fn test_unknown_path_is_name_not_found() {
        let response = send(router(), Method::GET, "/nothing/here").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_str(&text(response).await).unwrap();
        assert_eq!(body["errcode"], 1004);
        assert_eq!(body["msg"], "Requested name not found on server: /nothing/here");
    }

    #[tokio::test]
    async fn test_options_returns_route_metadata() {
        let response = send(router(), Method::OPTIONS, "/things/42").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ALLOW], "GET");
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let body: serde_json::Value = serde_json::from_str(&text(response).await).unwrap();
        assert_eq!(body["name"], "thing");
    }
}
