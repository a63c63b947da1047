//! Bibliographic API access.
//!
//! This module defines the [`ScholarApi`] seam used by the pipeline, the
//! Semantic Scholar client behind it, and the retry policy wrapped around
//! every request.

pub mod client;
#[cfg(test)]
pub mod mock;
pub mod retry;

pub use client::SemanticScholarClient;
pub use retry::{RetryError, RetryPolicy};

use crate::models::{AuthorCandidate, Publication};
use thiserror::Error;

/// Errors returned by a single API request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API asked us to slow down (HTTP 429).
    #[error("rate limited by the API")]
    RateLimited,

    /// Any other non-success status.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, timeout, or response decoding failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A retried request never succeeded.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<ApiError> },
}

impl ApiError {
    /// Whether the request may succeed if sent again after a pause.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }
}

impl From<RetryError<ApiError>> for ApiError {
    fn from(err: RetryError<ApiError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => ApiError::RetriesExhausted {
                attempts,
                last: Box::new(last),
            },
            RetryError::Fatal(e) => e,
        }
    }
}

/// Author search and publication listing, as needed by the pipeline.
#[allow(async_fn_in_trait)]
pub trait ScholarApi {
    /// Search authors by name, returning at most `limit` candidates in ranked order.
    async fn search_authors(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<AuthorCandidate>, ApiError>;

    /// Fetch one page of an author's publications.
    async fn author_papers(
        &self,
        author_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Publication>, ApiError>;
}
