//! Request dispatcher.
//!
//! # Responsibilities
//! - Match the request path against every compiled concrete path
//! - Pick the pipeline registered for the request verb
//! - Route `OPTIONS` to the synthesized preflight pipeline
//!
//! # Design Decisions
//! - Paths are tried most specific first, same order as preflight resolution
//! - A path that matches without the verb keeps the search going; if no
//!   path serves the verb the result is `MethodNotAllowed`
//! - Misses produce domain error envelopes, never framework 404s

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    response::{IntoResponse, Response},
};
use tower::ServiceExt;

use crate::error::{ErrorCode, ErrorEnvelope};
use crate::http::pipeline::Pipeline;
use crate::routing::matcher::PathPattern;
use crate::routing::route::Verb;

/// Everything registered at one concrete path.
#[derive(Clone)]
pub struct DispatchEntry {
    pub pattern: PathPattern,
    /// Index of the declaring route.
    pub route: usize,
    pub methods: HashMap<Verb, Pipeline>,
    pub preflight: Pipeline,
}

impl DispatchEntry {
    pub fn new(pattern: PathPattern, route: usize, preflight: Pipeline) -> Self {
        Self {
            pattern,
            route,
            methods: HashMap::new(),
            preflight,
        }
    }
}

/// Immutable path → pipeline lookup shared by all requests.
pub struct Dispatcher {
    entries: Vec<DispatchEntry>,
}

impl Dispatcher {
    pub fn new(mut entries: Vec<DispatchEntry>) -> Self {
        entries.sort_by(|a, b| a.pattern.cmp_specificity(&b.pattern));
        Self { entries }
    }

    /// Concrete paths in match order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.pattern.path())
    }

    pub async fn dispatch(&self, mut request: Request) -> Response {
        let path = request.uri().path().to_string();
        let is_preflight = request.method() == Method::OPTIONS;
        let verb = Verb::try_from(request.method()).ok();
        let mut path_matched = false;

        for entry in &self.entries {
            let Some(params) = entry.pattern.captures(&path) else {
                continue;
            };
            path_matched = true;

            let pipeline = if is_preflight {
                Some(&entry.preflight)
            } else {
                verb.and_then(|v| entry.methods.get(&v))
            };
            let Some(pipeline) = pipeline else {
                continue;
            };

            request.extensions_mut().insert(params);
            return match pipeline.clone().oneshot(request).await {
                Ok(response) => response,
                Err(never) => match never {},
            };
        }

        if path_matched {
            let method = request.method().to_string();
            ErrorEnvelope::new(ErrorCode::MethodNotAllowed)
                .with_args(&[&method])
                .into_response()
        } else {
            ErrorEnvelope::new(ErrorCode::NameNotFound)
                .with_args(&[&path])
                .into_response()
        }
    }
}

/// Router fallback handler.
pub async fn dispatch_handler(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request,
) -> Response {
    dispatcher.dispatch(request).await
}
