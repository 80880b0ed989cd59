//! Declarative route model.
//!
//! A `RouteTable` is built once at startup and is read-only afterwards.
//! Its JSON form is what preflight `OPTIONS` responses return.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use axum::http::Method;
use serde::{Deserialize, Serialize};

use crate::http::Endpoint;
use crate::routing::matcher::{PathPattern, PatternError};

/// HTTP verbs a route can declare. `OPTIONS` is always synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Head => "HEAD",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        }
    }

    pub fn to_method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Head => Method::HEAD,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "HEAD" => Ok(Verb::Head),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "PATCH" => Ok(Verb::Patch),
            "DELETE" => Ok(Verb::Delete),
            other => Err(format!("unsupported verb: {other}")),
        }
    }
}

impl TryFrom<&Method> for Verb {
    type Error = String;

    fn try_from(method: &Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

/// Information about a parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub required: bool,
}

/// A header a route expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub details: Detail,
}

const AUTH_HEADER: &str = "authorization: Bearer <YOUR_JWT_TOKEN>";

impl Header {
    pub fn new(name: impl Into<String>, details: Detail) -> Self {
        Self {
            name: name.into(),
            details,
        }
    }

    /// Bearer token header for secure routes.
    pub fn auth_required() -> Self {
        Self::new(
            AUTH_HEADER,
            Detail {
                required: true,
                ..Detail::default()
            },
        )
    }

    /// Bearer token header for routes where authentication is optional.
    pub fn auth_optional() -> Self {
        Self::new(AUTH_HEADER, Detail::default())
    }
}

/// One representation (extension) of a method and the handler serving it.
#[derive(Debug, Clone, Serialize)]
pub struct FormatHandler {
    /// Format extension, e.g. `.json`, `.proto`, or `""` for the default.
    pub extension: String,

    #[serde(skip)]
    pub handler: Endpoint,
}

impl FormatHandler {
    pub fn new(extension: impl Into<String>, handler: Endpoint) -> Self {
        Self {
            extension: extension.into(),
            handler,
        }
    }
}

/// An HTTP verb with its format handlers.
#[derive(Debug, Clone, Serialize)]
pub struct RouteMethod {
    #[serde(rename = "type")]
    pub verb: Verb,

    pub description: String,

    #[serde(rename = "handler")]
    pub handlers: Vec<FormatHandler>,
}

impl RouteMethod {
    pub fn new(verb: Verb, description: impl Into<String>) -> Self {
        Self {
            verb,
            description: description.into(),
            handlers: Vec::new(),
        }
    }

    /// Serve this verb at `uri + extension`.
    pub fn format(mut self, extension: impl Into<String>, handler: Endpoint) -> Self {
        self.handlers.push(FormatHandler::new(extension, handler));
        self
    }
}

/// Declaration of one API route.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub name: String,
    pub description: String,
    pub uri: String,
    pub headers: Vec<Header>,
    pub methods: Vec<RouteMethod>,
    pub secure_methods: Vec<RouteMethod>,

    /// Skip CSRF enforcement on this route.
    #[serde(skip)]
    pub csrf_exempt: bool,
}

impl Route {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            uri: uri.into(),
            headers: Vec::new(),
            methods: Vec::new(),
            secure_methods: Vec::new(),
            csrf_exempt: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn header(mut self, header: Header) -> Self {
        self.headers.push(header);
        self
    }

    /// Add an unauthenticated method.
    pub fn method(mut self, method: RouteMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Add a method that requires authentication.
    pub fn secure_method(mut self, method: RouteMethod) -> Self {
        self.secure_methods.push(method);
        self
    }

    pub fn csrf_exempt(mut self) -> Self {
        self.csrf_exempt = true;
        self
    }

    /// Verbs this route serves, deduplicated, in declaration order.
    pub fn allowed_verbs(&self) -> Vec<Verb> {
        let mut seen = HashSet::new();
        self.methods
            .iter()
            .chain(&self.secure_methods)
            .map(|m| m.verb)
            .filter(|v| seen.insert(*v))
            .collect()
    }

    /// Every `(verb, concrete path, secure, handler)` this route registers.
    pub fn endpoints(&self) -> impl Iterator<Item = RouteEndpoint<'_>> {
        let plain = self.methods.iter().map(|m| (m, false));
        let secure = self.secure_methods.iter().map(|m| (m, true));
        plain.chain(secure).flat_map(move |(method, secure)| {
            method.handlers.iter().map(move |fh| RouteEndpoint {
                verb: method.verb,
                path: format!("{}{}", self.uri, fh.extension),
                secure,
                handler: &fh.handler,
            })
        })
    }
}

/// A flattened registration produced by [`Route::endpoints`].
#[derive(Debug)]
pub struct RouteEndpoint<'a> {
    pub verb: Verb,
    pub path: String,
    pub secure: bool,
    pub handler: &'a Endpoint,
}

/// Configuration errors detected while building a route table.
#[derive(Debug, thiserror::Error)]
pub enum RouteTableError {
    #[error("duplicate route name: {0}")]
    DuplicateName(String),

    #[error("route {route}: {verb} {path} is registered twice")]
    DuplicateEndpoint {
        route: String,
        verb: Verb,
        path: String,
    },

    #[error("route {route}: invalid path {path}: {source}")]
    InvalidPath {
        route: String,
        path: String,
        #[source]
        source: PatternError,
    },

    #[error("routes {first} and {second} both resolve preflight pattern {pattern}")]
    AmbiguousPreflight {
        first: String,
        second: String,
        pattern: String,
    },
}

/// A compiled concrete path and the index of the route declaring it.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    pub route: usize,
    pub pattern: PathPattern,
}

/// Ordered, validated sequence of routes.
///
/// A route's position is its stable index, used as the preflight lookup key.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    patterns: Vec<RoutePattern>,
}

impl RouteTable {
    /// Validate and freeze a list of routes.
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteTableError> {
        let mut names = HashSet::new();
        let mut endpoints = HashSet::new();
        let mut owners: HashMap<String, usize> = HashMap::new();
        let mut patterns = Vec::new();

        for (index, route) in routes.iter().enumerate() {
            if !names.insert(route.name.as_str()) {
                return Err(RouteTableError::DuplicateName(route.name.clone()));
            }

            for endpoint in route.endpoints() {
                if !endpoints.insert((endpoint.verb, endpoint.path.clone())) {
                    return Err(RouteTableError::DuplicateEndpoint {
                        route: route.name.clone(),
                        verb: endpoint.verb,
                        path: endpoint.path,
                    });
                }

                if patterns
                    .iter()
                    .any(|p: &RoutePattern| p.route == index && p.pattern.path() == endpoint.path)
                {
                    continue;
                }

                let pattern = PathPattern::compile(&endpoint.path).map_err(|source| {
                    RouteTableError::InvalidPath {
                        route: route.name.clone(),
                        path: endpoint.path.clone(),
                        source,
                    }
                })?;

                match owners.get(pattern.expression()) {
                    Some(&owner) if owner != index => {
                        return Err(RouteTableError::AmbiguousPreflight {
                            first: routes[owner].name.clone(),
                            second: route.name.clone(),
                            pattern: pattern.expression().to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        owners.insert(pattern.expression().to_string(), index);
                    }
                }

                patterns.push(RoutePattern { route: index, pattern });
            }
        }

        Ok(Self { routes, patterns })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    /// One compiled pattern per distinct concrete path, in declaration order.
    pub fn patterns(&self) -> &[RoutePattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
