//! Request-dispatch layer for JSON/protobuf HTTP APIs.
//!
//! Declare routes once, compile them into per-endpoint middleware pipelines,
//! and serve the result with axum.

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod routing;

// Request concerns
pub mod pagination;
pub mod security;
pub mod store;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use error::{ErrorCode, ErrorEnvelope};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{CompiledRouter, Route, RouteMethod, RouteTable, RouterCompiler, Verb};
