//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and log levels
//! - Reject ambiguous or empty key material
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("unknown log level: {0}")]
    InvalidLogLevel(String),

    #[error("security.csrf_key must not be empty")]
    EmptyCsrfKey,

    #[error("security.csrf_cookie_name is not a valid cookie name: {0:?}")]
    InvalidCsrfCookieName(String),

    #[error("security.csrf_max_age_secs must be positive")]
    ZeroCsrfMaxAge,

    #[error("auth.rsa_public_key_pem and auth.hmac_secret are mutually exclusive")]
    ConflictingAuthKeys,

    #[error("cors.allow_origin must not be empty")]
    EmptyAllowOrigin,
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Check the configuration for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if !LOG_LEVELS.contains(&observability.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }

    if matches!(config.security.csrf_key.as_deref(), Some("")) {
        errors.push(ValidationError::EmptyCsrfKey);
    }

    let cookie_name = &config.security.csrf_cookie_name;
    let name_ok = !cookie_name.is_empty()
        && cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-.".contains(c));
    if !name_ok {
        errors.push(ValidationError::InvalidCsrfCookieName(cookie_name.clone()));
    }

    if config.security.csrf_max_age_secs == 0 {
        errors.push(ValidationError::ZeroCsrfMaxAge);
    }

    if config.auth.rsa_public_key_pem.is_some() && config.auth.hmac_secret.is_some() {
        errors.push(ValidationError::ConflictingAuthKeys);
    }

    if config.cors.allow_origin.trim().is_empty() {
        errors.push(ValidationError::EmptyAllowOrigin);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
