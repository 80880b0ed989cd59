//! CSRF token issuance and verification.
//!
//! Double-submit scheme. Each client holds a random secret in a cookie, and
//! every token is bound to that secret and to its issue time:
//!
//! ```text
//! token = base64url(nonce || issued_at || HMAC-SHA256(key, secret || nonce || issued_at))
//! ```
//!
//! A token only verifies when presented together with the cookie it was
//! issued against, and only until it is older than the configured max age.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::{header, HeaderMap, HeaderName, Method};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cookie::{Cookie, SameSite};
use hmac::{digest::InvalidLength, Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const X_CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrf-token");

const NONCE_LEN: usize = 32;
const STAMP_LEN: usize = 8;
const TAG_LEN: usize = 32;
const TOKEN_LEN: usize = NONCE_LEN + STAMP_LEN + TAG_LEN;
const SECRET_LEN: usize = 32;

/// Methods that never change state and so never need a token.
pub fn is_safe_method(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE].contains(method)
}

/// Signs and checks CSRF tokens with one secret key.
#[derive(Clone)]
pub struct CsrfTokens {
    mac: HmacSha256,
    cookie_name: String,
    max_age: Duration,
    secure_cookie: bool,
}

impl CsrfTokens {
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(key.as_ref())?,
            cookie_name: "_csrf".to_string(),
            max_age: Duration::from_secs(12 * 60 * 60),
            secure_cookie: true,
        })
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Whether the secret cookie carries the `Secure` attribute.
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }

    /// A fresh per-client secret, the value of the CSRF cookie.
    pub fn new_secret(&self) -> String {
        let mut secret = [0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        URL_SAFE_NO_PAD.encode(secret)
    }

    /// The client's secret from the `Cookie` headers, if present and well formed.
    pub fn secret_from(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == self.cookie_name)
            .map(|c| c.value().to_string())
            .filter(|secret| decode_secret(secret).is_some())
    }

    /// `Set-Cookie` value storing `secret` on the client.
    pub fn cookie(&self, secret: &str) -> String {
        let max_age = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);
        Cookie::build((self.cookie_name.clone(), secret.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.secure_cookie)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::seconds(max_age))
            .build()
            .to_string()
    }

    /// A fresh token bound to `secret`.
    pub fn issue(&self, secret: &str) -> String {
        self.issue_at(secret, now_secs())
    }

    /// True if `token` was issued against `secret` with this key and has not expired.
    pub fn verify(&self, secret: &str, token: &str) -> bool {
        self.verify_at(secret, token, now_secs())
    }

    fn issue_at(&self, secret: &str, issued_at: u64) -> String {
        let mut token = [0u8; TOKEN_LEN];
        rand::thread_rng().fill_bytes(&mut token[..NONCE_LEN]);
        token[NONCE_LEN..NONCE_LEN + STAMP_LEN].copy_from_slice(&issued_at.to_be_bytes());

        let tag = self.tag(secret, &token[..NONCE_LEN + STAMP_LEN]);
        token[NONCE_LEN + STAMP_LEN..].copy_from_slice(&tag.finalize().into_bytes());

        URL_SAFE_NO_PAD.encode(token)
    }

    fn verify_at(&self, secret: &str, token: &str, now: u64) -> bool {
        if decode_secret(secret).is_none() {
            return false;
        }
        let Ok(raw) = URL_SAFE_NO_PAD.decode(token.trim()) else {
            return false;
        };
        if raw.len() != TOKEN_LEN {
            return false;
        }

        let (body, tag) = raw.split_at(NONCE_LEN + STAMP_LEN);
        if self.tag(secret, body).verify_slice(tag).is_err() {
            return false;
        }

        let mut stamp = [0u8; STAMP_LEN];
        stamp.copy_from_slice(&body[NONCE_LEN..]);
        now.saturating_sub(u64::from_be_bytes(stamp)) <= self.max_age.as_secs()
    }

    fn tag(&self, secret: &str, body: &[u8]) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(secret.as_bytes());
        mac.update(body);
        mac
    }
}

impl fmt::Debug for CsrfTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfTokens")
            .field("cookie_name", &self.cookie_name)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

fn decode_secret(secret: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(secret)
        .ok()
        .filter(|raw| raw.len() == SECRET_LEN)
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn tokens() -> CsrfTokens {
        CsrfTokens::new("secret").unwrap()
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::OPTIONS));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::DELETE));
    }

    #[test]
    fn test_issued_token_verifies_with_its_secret() {
        let tokens = tokens();
        let secret = tokens.new_secret();
        let token = tokens.issue(&secret);
        assert!(tokens.verify(&secret, &token));
    }

    #[test]
    fn test_token_rejected_with_another_secret() {
        let tokens = tokens();
        let token = tokens.issue(&tokens.new_secret());
        assert!(!tokens.verify(&tokens.new_secret(), &token));
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens = tokens();
        let secret = tokens.new_secret();
        assert_ne!(tokens.issue(&secret), tokens.issue(&secret));
    }

    #[test]
    fn test_other_key_rejected() {
        let one = CsrfTokens::new("one").unwrap();
        let secret = one.new_secret();
        let token = one.issue(&secret);
        assert!(!CsrfTokens::new("two").unwrap().verify(&secret, &token));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = tokens().with_max_age(Duration::from_secs(60));
        let secret = tokens.new_secret();
        let token = tokens.issue_at(&secret, 1_000);
        assert!(tokens.verify_at(&secret, &token, 1_060));
        assert!(!tokens.verify_at(&secret, &token, 1_061));
    }

    #[test]
    fn test_garbage_rejected() {
        let tokens = tokens();
        let secret = tokens.new_secret();
        assert!(!tokens.verify(&secret, ""));
        assert!(!tokens.verify(&secret, "not base64!"));
        assert!(!tokens.verify(&secret, &URL_SAFE_NO_PAD.encode([0u8; 10])));
        assert!(!tokens.verify("short", &tokens.issue("short")));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let tokens = tokens();
        let secret = tokens.new_secret();
        let mut raw = URL_SAFE_NO_PAD.decode(tokens.issue(&secret)).unwrap();
        raw[NONCE_LEN] ^= 0xff;
        assert!(!tokens.verify(&secret, &URL_SAFE_NO_PAD.encode(raw)));
    }

    #[test]
    fn test_secret_read_from_cookie_header() {
        let tokens = tokens().with_cookie_name("csrf_id");
        let secret = tokens.new_secret();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; csrf_id={secret}")).unwrap(),
        );
        assert_eq!(tokens.secret_from(&headers), Some(secret));

        headers.insert(header::COOKIE, HeaderValue::from_static("csrf_id=forged"));
        assert_eq!(tokens.secret_from(&headers), None);
        assert_eq!(tokens.secret_from(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let tokens = tokens().with_max_age(Duration::from_secs(600));
        let cookie = tokens.cookie("abc");
        assert!(cookie.starts_with("_csrf=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=600"));

        let plain = tokens.with_secure_cookie(false).cookie("abc");
        assert!(!plain.contains("Secure"));
    }
}
