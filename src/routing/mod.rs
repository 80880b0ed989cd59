//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     Vec<Route>
//!     → route.rs (validate, compile concrete paths → RouteTable)
//!     → preflight.rs (sort patterns by specificity → PreflightIndex)
//!     → compiler.rs (one pipeline per endpoint → Dispatcher → axum Router)
//!
//! Incoming Request (method, path):
//!     → router.rs (first matching path serving the verb)
//!     → matcher.rs (capture placeholders → PathParams)
//!     → pipeline
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: most specific path first, ties broken by expression text
//! - First match wins
//! - Ambiguous declarations are rejected at startup, never resolved by order

pub mod compiler;
pub mod matcher;
pub mod preflight;
pub mod route;
pub mod router;

pub use compiler::{CompileError, CompiledRouter, RouterCompiler};
pub use matcher::{PathParams, PathPattern, PatternError};
pub use preflight::PreflightIndex;
pub use route::{Detail, Header, Route, RouteMethod, RouteTable, RouteTableError, Verb};
pub use router::Dispatcher;
