//! Paginated query execution.

use async_trait::async_trait;

use crate::pagination::request::PaginationRequest;

/// A query that can be run one page at a time.
///
/// `count` must apply the same predicate as `fetch`, without the bounds.
#[async_trait]
pub trait PaginatedQuery: Send + Sync {
    type Item: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn fetch(&self, limit: u64, offset: u64) -> Result<Vec<Self::Item>, Self::Error>;

    async fn count(&self) -> Result<u64, Self::Error>;
}

/// Description of the page that was returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationResult {
    pub page: u64,
    pub per_page: u64,
    pub url: String,
    /// Size of the whole result set, not of this page.
    pub total_count: u64,
    /// False when `page` lies past the last page. The first page of an empty
    /// result set is always found.
    pub page_found: bool,
}

impl PaginationResult {
    pub fn new(request: &PaginationRequest, total_count: u64) -> Self {
        let mut result = Self {
            page: request.page,
            per_page: request.per_page,
            url: request.url.clone(),
            total_count,
            page_found: false,
        };
        result.page_found =
            result.page <= result.last_page() || (result.page == 1 && total_count == 0);
        result
    }

    /// Number of pages, 0 when the result set is empty.
    pub fn last_page(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.per_page)
    }
}

/// Run `query` bounded by `request`, then count the unbounded result set.
pub async fn paginate<Q>(
    query: &Q,
    request: &PaginationRequest,
) -> Result<(Vec<Q::Item>, PaginationResult), Q::Error>
where
    Q: PaginatedQuery + ?Sized,
{
    let items = query.fetch(request.limit(), request.offset()).await?;
    let total_count = query.count().await?;

    tracing::debug!(
        page = request.page,
        per_page = request.per_page,
        returned = items.len(),
        total_count,
        "Paginated query"
    );

    Ok((items, PaginationResult::new(request, total_count)))
}

/// Paginated view over an in-memory collection.
#[derive(Debug, Clone, Default)]
pub struct MemoryQuery<T> {
    items: Vec<T>,
}

impl<T> MemoryQuery<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl<T> PaginatedQuery for MemoryQuery<T>
where
    T: Clone + Send + Sync,
{
    type Item = T;
    type Error = std::convert::Infallible;

    async fn fetch(&self, limit: u64, offset: u64) -> Result<Vec<T>, Self::Error> {
        Ok(self
            .items
            .iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, Self::Error> {
        Ok(self.items.len() as u64)
    }
}
