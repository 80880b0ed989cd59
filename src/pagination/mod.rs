//! Pagination engine.
//!
//! # Data Flow
//! ```text
//! Request query (?page=2&per_page=10)
//!     → request.rs (parse + bound → PaginationRequest)
//!     → result.rs (fetch page, count total → PaginationResult)
//!     → links.rs (Link: next/last/first/prev, X-Total-Count)
//! ```
//!
//! # Design Decisions
//! - Invalid `page`/`per_page` is rejected, never silently defaulted
//! - Oversized `per_page` falls back to the default size, not the maximum
//! - The engine reports `page_found`; callers decide between 404 and empty 200

pub mod links;
pub mod request;
pub mod result;

pub use links::{page_links, write_pagination_headers, X_TOTAL_COUNT};
pub use request::{PaginationRequest, DEFAULT_PER_PAGE, MAX_PER_PAGE};
pub use result::{paginate, MemoryQuery, PaginatedQuery, PaginationResult};
