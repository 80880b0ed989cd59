//! Parsing of `page` / `per_page` query arguments.

use axum::http::Request;

use crate::error::{ErrorCode, ErrorEnvelope};

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;
pub const DEFAULT_PAGE: u64 = 1;

pub const PAGE_ARG: &str = "page";
pub const PER_PAGE_ARG: &str = "per_page";

/// Pagination values requested in a URL query (e.g. `?page=2&per_page=10`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationRequest {
    /// Whether the query carried a `page` argument.
    pub page_requested: bool,
    /// Requested page, always >= 1.
    pub page: u64,
    /// Page size, in `1..=MAX_PER_PAGE`.
    pub per_page: u64,
    /// The request URL the links are derived from.
    pub url: String,
}

impl PaginationRequest {
    /// Parse from a raw query string.
    ///
    /// A `per_page` above the maximum falls back to the default page size.
    pub fn from_query(query: Option<&str>, url: impl Into<String>) -> Result<Self, ErrorEnvelope> {
        let mut request = Self {
            page_requested: false,
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            url: url.into(),
        };

        let query = query.unwrap_or_default();
        if let Some(page) = first_value(query, PAGE_ARG) {
            request.page_requested = true;
            request.page = parse_positive(&page, PAGE_ARG)?;
        }

        if let Some(per_page) = first_value(query, PER_PAGE_ARG) {
            request.per_page = match parse_positive(&per_page, PER_PAGE_ARG)? {
                n if n > MAX_PER_PAGE => DEFAULT_PER_PAGE,
                n => n,
            };
        }

        Ok(request)
    }

    /// Parse from the URI of an incoming request.
    pub fn from_request<B>(req: &Request<B>) -> Result<Self, ErrorEnvelope> {
        Self::from_query(req.uri().query(), req.uri().to_string())
    }

    pub fn limit(&self) -> u64 {
        self.per_page
    }

    /// Rows to skip. Saturates for pages far past any real result set.
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1).saturating_mul(self.per_page)
    }
}

// Empty values count as absent.
fn first_value(query: &str, key: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

fn parse_positive(value: &str, arg: &str) -> Result<u64, ErrorEnvelope> {
    let invalid = || ErrorEnvelope::new(ErrorCode::InvalidPaginationRequest);
    let n: i64 = value
        .parse()
        .map_err(|e| {
            ErrorEnvelope::with_cause(ErrorCode::InvalidPaginationRequest, e).with_args(&[arg])
        })?;
    if n <= 0 {
        return Err(invalid().with_args(&[arg]));
    }
    Ok(n as u64)
}
