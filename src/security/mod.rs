//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → csrf.rs (issue tokens on safe methods, verify on unsafe ones)
//!     → credentials.rs (bearer token → Identity via CredentialVerifier)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: secure routes reject when no verifier is configured
//! - CSRF tokens are HMACs bound to a per-client cookie secret, no server-side session
//! - Verification is a capability trait so tests can swap it

pub mod credentials;
pub mod csrf;

pub use credentials::{user_identity, CredentialError, CredentialVerifier, Identity, JwtVerifier};
pub use csrf::{is_safe_method, CsrfTokens, X_CSRF_TOKEN};
