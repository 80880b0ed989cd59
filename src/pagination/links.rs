//! RFC 5988 `Link` and `X-Total-Count` response headers.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use url::{form_urlencoded, Url};

use crate::pagination::request::{PAGE_ARG, PER_PAGE_ARG};
use crate::pagination::result::PaginationResult;

pub const X_TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

// Base used to resolve origin-form request URLs.
const RELATIVE_BASE: &str = "http://relative.invalid";

/// Write `Link` (possibly empty) and `X-Total-Count` for `page`.
pub fn write_pagination_headers(page: &PaginationResult, headers: &mut HeaderMap) {
    let links = page_links(page)
        .into_iter()
        .map(|(rel, target)| format!("<{}>; rel=\"{rel}\"", link_url(page, target)))
        .collect::<Vec<_>>()
        .join(", ");

    match HeaderValue::from_str(&links) {
        Ok(value) => {
            headers.insert(axum::http::header::LINK, value);
        }
        Err(e) => tracing::warn!(
            error = %e,
            url = %page.url,
            "Skipping unrepresentable Link header"
        ),
    }
    headers.insert(X_TOTAL_COUNT, HeaderValue::from(page.total_count));
}

/// `(relation, target page)` pairs that apply to `page`.
pub fn page_links(page: &PaginationResult) -> Vec<(&'static str, u64)> {
    let last = page.last_page();
    let mut links = Vec::with_capacity(4);

    if page.page < last {
        links.push(("next", page.page + 1));
        links.push(("last", last));
    }

    if page.page > 1 {
        links.push(("first", 1));
        // Floored at 1 so an empty result (last page 0) still links to a real page.
        links.push(("prev", (page.page - 1).min(last).max(1)));
    }

    links
}

fn link_url(page: &PaginationResult, target: u64) -> String {
    let (mut url, relative) = match Url::parse(&page.url) {
        Ok(url) => (url, false),
        Err(_) => match Url::parse(RELATIVE_BASE).and_then(|base| base.join(&page.url)) {
            Ok(url) => (url, true),
            Err(_) => return fallback_link(target, page.per_page),
        },
    };

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != PAGE_ARG && k != PER_PAGE_ARG)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push((PAGE_ARG.to_string(), target.to_string()));
    pairs.push((PER_PAGE_ARG.to_string(), page.per_page.to_string()));
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    url.set_query(Some(&query));

    if relative {
        let mut out = url.path().to_string();
        out.push('?');
        out.push_str(&query);
        out
    } else {
        url.to_string()
    }
}

fn fallback_link(target: u64, per_page: u64) -> String {
    format!("?{PAGE_ARG}={target}&{PER_PAGE_ARG}={per_page}")
}
