//! Per-route middleware stages.
//!
//! # Pipeline (outer to inner)
//! ```text
//! access_log      → one log event + request metrics, elapsed covers everything below
//! panic           → CatchPanicLayer handler, generic 500 envelope
//! transport       → HTTPS redirect, hardening headers
//! csrf::issue     → X-CSRF-Token on safe methods
//! precondition    → data store must be available
//! auth            → optional or required credentials
//! cors            → Access-Control-* headers
//! csrf::enforce   → unsafe methods must echo a valid token
//! analytics       → spawned telemetry after the handler returns
//! endpoint
//! ```
//!
//! # Design Decisions
//! - Each stage may short-circuit by returning a response without calling `next`
//! - Stages that decorate responses do so after `next` returns, so they see
//!   every outcome produced further in
//! - All state is injected through `StageContext`, no globals

pub mod access_log;
pub mod analytics;
pub mod auth;
pub mod cors;
pub mod csrf;
pub mod panic;
pub mod precondition;
pub mod transport;

use std::fmt;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::observability::TelemetrySink;
use crate::security::{CredentialVerifier, CsrfTokens};
use crate::store::DataStore;

pub use cors::CorsHeaders;

/// Process-wide collaborators shared by every pipeline.
pub struct PipelineState {
    pub config: Arc<ServerConfig>,
    pub cors: CorsHeaders,
    /// `None` disables CSRF issuance and enforcement.
    pub csrf: Option<CsrfTokens>,
    /// `None` means no store is required.
    pub store: Option<Arc<dyn DataStore>>,
    /// `None` rejects every credential.
    pub verifier: Option<Arc<dyn CredentialVerifier>>,
    pub telemetry: Arc<dyn TelemetrySink>,
}

impl fmt::Debug for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineState")
            .field("csrf", &self.csrf.is_some())
            .field("store", &self.store.is_some())
            .field("verifier", &self.verifier.is_some())
            .finish_non_exhaustive()
    }
}

/// What a pipeline knows about the endpoint it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteContext {
    pub name: String,
    /// Credentials required.
    pub secure: bool,
    pub csrf_exempt: bool,
}

/// State handed to every stage of one pipeline.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub shared: Arc<PipelineState>,
    pub route: Arc<RouteContext>,
}
