//! In-memory [`ScholarApi`] for tests.

use crate::api::{ApiError, ScholarApi};
use crate::models::{AuthorCandidate, Publication};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serves canned authors and papers, with optional injected failures.
#[derive(Default)]
pub struct MockScholar {
    authors: HashMap<String, Vec<AuthorCandidate>>,
    papers: HashMap<String, Vec<Publication>>,
    /// Errors returned, in order, before any page request is served.
    page_failures: Mutex<VecDeque<ApiError>>,
    /// Authors whose page requests are always rate limited.
    throttled: Vec<String>,
    pub search_calls: AtomicUsize,
    pub page_calls: AtomicUsize,
}

impl MockScholar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_author(mut self, query: &str, id: &str, paper_count: u64) -> Self {
        self.authors
            .entry(query.to_string())
            .or_default()
            .push(AuthorCandidate {
                author_id: id.to_string(),
                name: query.to_string(),
                paper_count,
            });
        self
    }

    pub fn with_papers(mut self, id: &str, papers: Vec<Publication>) -> Self {
        self.papers.insert(id.to_string(), papers);
        self
    }

    pub fn failing_pages(self, errors: Vec<ApiError>) -> Self {
        *self.page_failures.lock().unwrap() = errors.into();
        self
    }

    pub fn throttled(mut self, id: &str) -> Self {
        self.throttled.push(id.to_string());
        self
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn pages(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }
}

impl ScholarApi for MockScholar {
    async fn search_authors(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<AuthorCandidate>, ApiError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let mut found = self.authors.get(query).cloned().unwrap_or_default();
        found.truncate(limit);
        Ok(found)
    }

    async fn author_papers(
        &self,
        author_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Publication>, ApiError> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);

        if self.throttled.iter().any(|id| id == author_id) {
            return Err(ApiError::RateLimited);
        }
        if let Some(err) = self.page_failures.lock().unwrap().pop_front() {
            return Err(err);
        }

        let papers = self.papers.get(author_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(papers.iter().skip(offset).take(limit).cloned().collect())
    }
}
