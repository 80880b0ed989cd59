//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Transport hardening and CSRF settings.
    pub security: SecurityConfig,

    /// Cross-origin response headers.
    pub cors: CorsConfig,

    /// Credential verification settings.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Transport security and CSRF configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Development mode disables the HTTPS redirect.
    pub is_development: bool,

    /// Redirect plain HTTP requests to HTTPS.
    pub ssl_redirect: bool,

    /// Add `X-Frame-Options: DENY`.
    pub frame_deny: bool,

    /// Add `X-Content-Type-Options: nosniff`.
    pub content_type_nosniff: bool,

    /// Add `X-XSS-Protection: 1; mode=block`.
    pub browser_xss_filter: bool,

    /// Value of the `Content-Security-Policy` header, if any.
    pub content_security_policy: Option<String>,

    /// Secret used to sign CSRF tokens. CSRF protection is off when unset.
    pub csrf_key: Option<String>,

    /// Cookie holding the per-client secret each CSRF token is bound to.
    pub csrf_cookie_name: String,

    /// Lifetime of CSRF tokens and of the secret cookie, in seconds.
    pub csrf_max_age_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            is_development: false,
            ssl_redirect: true,
            frame_deny: true,
            content_type_nosniff: true,
            browser_xss_filter: true,
            content_security_policy: Some("default-src 'self'".to_string()),
            csrf_key: None,
            csrf_cookie_name: "_csrf".to_string(),
            csrf_max_age_secs: 12 * 60 * 60,
        }
    }
}

/// Values of the `Access-Control-*` response headers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE"]
                .into_iter()
                .map(String::from)
                .collect(),
            allow_headers: [
                "Accept",
                "Accept-Language",
                "Content-Language",
                "Origin",
                "Content-Type",
                "Content-Length",
                "Accept-Encoding",
                "X-CSRF-Token",
                "Authorization",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            expose_headers: ["Link", "X-Total-Count", "X-CSRF-Token"]
                .into_iter()
                .map(String::from)
                .collect(),
            allow_credentials: true,
        }
    }
}

/// Credential verification configuration.
///
/// At most one key source may be set. With neither, secure routes reject
/// every request.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// PEM-encoded RSA public key for RS256 tokens.
    pub rsa_public_key_pem: Option<String>,

    /// Shared secret for HS256 tokens.
    pub hmac_secret: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
