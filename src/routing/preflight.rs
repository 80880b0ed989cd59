//! CORS preflight resolution.
//!
//! Maps a concrete request path (placeholders already substituted) back to
//! the route that declared it, so `OPTIONS` can report that route's metadata
//! and `Allow` header.
//!
//! # Design Decisions
//! - Built once from the `RouteTable`, immutable afterwards
//! - Patterns sorted most specific first; the first anchored match wins
//! - A linear scan per preflight; route tables are small

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{ErrorCode, ErrorEnvelope};
use crate::routing::matcher::PathPattern;
use crate::routing::route::RouteTable;

/// Sorted `pattern → route index` lookup.
#[derive(Debug, Clone)]
pub struct PreflightIndex {
    entries: Vec<(PathPattern, usize)>,
}

impl PreflightIndex {
    pub fn new(table: &RouteTable) -> Self {
        let mut entries: Vec<(PathPattern, usize)> = Vec::new();
        for rp in table.patterns() {
            if entries
                .iter()
                .any(|(p, _)| p.expression() == rp.pattern.expression())
            {
                continue;
            }
            entries.push((rp.pattern.clone(), rp.route));
        }
        entries.sort_by(|(a, _), (b, _)| a.cmp_specificity(b));

        Self { entries }
    }

    /// Index of the route owning `path`, or `None` if nothing matches.
    pub fn resolve(&self, path: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, route)| *route)
    }

    /// Expressions in match order.
    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(p, _)| p.expression())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the `OPTIONS` response for `path`.
///
/// The body is the resolved route's metadata; `Allow` lists its verbs.
pub fn preflight_response(
    table: &RouteTable,
    index: &PreflightIndex,
    path: &str,
) -> Result<Response, ErrorEnvelope> {
    let route = index
        .resolve(path)
        .and_then(|i| table.get(i))
        .ok_or_else(|| ErrorEnvelope::new(ErrorCode::NameNotFound).with_args(&[path]))?;

    let allow = route
        .allowed_verbs()
        .iter()
        .map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let allow = HeaderValue::from_str(&allow)
        .map_err(|e| ErrorEnvelope::with_cause(ErrorCode::UnexpectedFailure, e))?;

    let mut response = Json(route).into_response();
    response.headers_mut().insert(header::ALLOW, allow);
    Ok(response)
}
