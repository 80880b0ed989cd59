//! Credential verification.
//!
//! The authentication stage treats verification as a pass/fail capability:
//! a bearer token goes in, an `Identity` or an error comes out.

use async_trait::async_trait;
use axum::http::{header, HeaderMap, Request};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::config::AuthConfig;
use crate::error::{ErrorCode, ErrorEnvelope};

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// The `sub` claim.
    pub subject: String,
    pub claims: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("token carries no subject")]
    MissingSubject,

    #[error("malformed authorization header")]
    MalformedHeader,
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Identity, CredentialError>;
}

/// JWT verification with a single key (RS256 or HS256).
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// RS256 with a PEM-encoded RSA public key.
    pub fn rsa_pem(pem: &str) -> Result<Self, CredentialError> {
        let key = DecodingKey::from_rsa_pem(pem.as_bytes())?;
        Ok(Self::with_key(key, Algorithm::RS256))
    }

    /// HS256 with a shared secret.
    pub fn hmac_secret(secret: &str) -> Self {
        Self::with_key(DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
    }

    /// The verifier described by `config`, if any key is configured.
    pub fn from_config(config: &AuthConfig) -> Result<Option<Self>, CredentialError> {
        if let Some(pem) = &config.rsa_public_key_pem {
            return Self::rsa_pem(pem).map(Some);
        }
        Ok(config.hmac_secret.as_deref().map(Self::hmac_secret))
    }

    fn with_key(key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        // exp/nbf are checked when present but not required
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        Self { key, validation }
    }
}

#[async_trait]
impl CredentialVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, CredentialError> {
        let data = decode::<serde_json::Value>(token, &self.key, &self.validation)?;
        let subject = data
            .claims
            .get("sub")
            .and_then(|s| s.as_str())
            .ok_or(CredentialError::MissingSubject)?
            .to_string();
        Ok(Identity {
            subject,
            claims: data.claims,
        })
    }
}

/// Token from `Authorization: Bearer <token>`.
///
/// `Ok(None)` when no credential was sent at all.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, CredentialError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| CredentialError::MalformedHeader)?;
    if value.trim().is_empty() {
        return Ok(None);
    }

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
            Ok(Some(token))
        }
        _ => Err(CredentialError::MalformedHeader),
    }
}

/// The caller's identity, for handlers behind the authentication stage.
pub fn user_identity<B>(req: &Request<B>) -> Result<&Identity, ErrorEnvelope> {
    req.extensions()
        .get::<Identity>()
        .ok_or_else(|| ErrorEnvelope::new(ErrorCode::AuthNoUser))
}
