//! Author resolution.

use crate::api::{ApiError, RetryPolicy, ScholarApi};
use crate::cache::AuthorCache;
use crate::models::AuthorCandidate;
use crate::pipeline::ResearcherError;
use tracing::{debug, info};

/// Normalize a researcher name for searching and caching.
///
/// Inserts a space where a lowercase letter is directly followed by an
/// uppercase one, which splits names whose parts were concatenated
/// ("JaneDoeSmith" -> "Jane Doe Smith").
pub fn normalize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len() + 4);
    let mut prev: Option<char> = None;

    for c in trimmed.chars() {
        if let Some(p) = prev {
            if p.is_lowercase() && c.is_uppercase() {
                out.push(' ');
            }
        }
        out.push(c);
        prev = Some(c);
    }

    out
}

/// Pick the candidate with the most papers; the earliest wins ties.
pub fn best_candidate(candidates: &[AuthorCandidate]) -> Option<&AuthorCandidate> {
    candidates.iter().fold(None, |best, c| match best {
        Some(b) if b.paper_count >= c.paper_count => Some(b),
        _ => Some(c),
    })
}

/// Resolves names to author IDs, consulting the cache first.
pub struct AuthorResolver {
    cache: AuthorCache,
    search_limit: usize,
    retry: RetryPolicy,
}

impl AuthorResolver {
    pub fn new(cache: AuthorCache, search_limit: usize, retry: RetryPolicy) -> Self {
        Self {
            cache,
            search_limit,
            retry,
        }
    }

    /// Resolve a raw name to an author ID.
    ///
    /// A new mapping is persisted before this returns.
    pub async fn resolve<A: ScholarApi>(
        &mut self,
        api: &A,
        raw_name: &str,
    ) -> Result<String, ResearcherError> {
        let key = normalize_name(raw_name);

        if let Some(id) = self.cache.get(&key) {
            debug!("Cache hit for {:?}: {}", key, id);
            return Ok(id.to_string());
        }

        let candidates = self
            .retry
            .run(
                || api.search_authors(&key, self.search_limit),
                ApiError::is_rate_limited,
            )
            .await
            .map_err(ApiError::from)?;

        let best = best_candidate(&candidates).ok_or_else(|| ResearcherError::NoMatch {
            name: key.clone(),
        })?;

        info!(
            "Resolved {:?} to {} {:?} ({} papers, {} candidates)",
            key,
            best.author_id,
            best.name,
            best.paper_count,
            candidates.len()
        );

        self.cache
            .insert(&key, &best.author_id)
            .map_err(ResearcherError::Cache)?;

        Ok(best.author_id.clone())
    }
}
