//! Paginated publication retrieval.

use crate::api::{ApiError, RetryPolicy, ScholarApi};
use crate::models::Publication;
use std::time::Duration;
use tracing::debug;

/// Fetches every publication of an author, one page at a time.
pub struct PublicationFetcher {
    page_size: usize,
    page_delay: Duration,
    retry: RetryPolicy,
}

impl PublicationFetcher {
    pub fn new(page_size: usize, page_delay: Duration, retry: RetryPolicy) -> Self {
        Self {
            page_size: page_size.max(1),
            page_delay,
            retry,
        }
    }

    /// Fetch pages from offset 0 until one comes back empty.
    ///
    /// Each page is retried independently under the retry policy; the
    /// first page that cannot be fetched fails the whole call.
    pub async fn fetch_all<A: ScholarApi>(
        &self,
        api: &A,
        author_id: &str,
    ) -> Result<Vec<Publication>, ApiError> {
        let mut publications = Vec::new();
        let mut offset = 0;

        loop {
            let page = self
                .retry
                .run(
                    || api.author_papers(author_id, offset, self.page_size),
                    ApiError::is_rate_limited,
                )
                .await?;

            if page.is_empty() {
                break;
            }

            debug!(
                "Fetched {} papers for {} at offset {}",
                page.len(),
                author_id,
                offset
            );
            offset += page.len();
            publications.extend(page);

            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        Ok(publications)
    }
}
