//! Semantic Scholar Graph API client.

use crate::api::{ApiError, ScholarApi};
use crate::config::ApiConfig;
use crate::models::{AuthorCandidate, Publication};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const AUTHOR_FIELDS: &str = "authorId,name,paperCount";
const PAPER_FIELDS: &str = "title,year,citationCount";

/// Envelope shared by the search and papers endpoints.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorData {
    author_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    paper_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperData {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    citation_count: Option<u64>,
}

impl From<PaperData> for Publication {
    fn from(paper: PaperData) -> Self {
        Self {
            title: paper.title,
            year: paper.year,
            citation_count: paper.citation_count.unwrap_or(0),
        }
    }
}

/// Client for the Semantic Scholar author endpoints.
pub struct SemanticScholarClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    /// Create a client from API settings.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("grantcite/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut request = self.http_client.get(url).query(query);
        if let Some(ref key) = self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        Ok(response.json().await?)
    }
}

/// Map a non-success status to an [`ApiError`].
fn classify_status(status: StatusCode, body: String) -> ApiError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        ApiError::RateLimited
    } else {
        ApiError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

fn into_candidates(page: Page<AuthorData>) -> Vec<AuthorCandidate> {
    page.data
        .into_iter()
        .filter_map(|author| {
            Some(AuthorCandidate {
                author_id: author.author_id?,
                name: author.name.unwrap_or_default(),
                paper_count: author.paper_count.unwrap_or(0),
            })
        })
        .collect()
}

impl ScholarApi for SemanticScholarClient {
    async fn search_authors(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<AuthorCandidate>, ApiError> {
        let url = format!("{}/author/search", self.base_url);
        debug!("Searching authors for {:?}", query);

        let page: Page<AuthorData> = self
            .get(
                &url,
                &[
                    ("query", query.to_string()),
                    ("limit", limit.to_string()),
                    ("fields", AUTHOR_FIELDS.to_string()),
                ],
            )
            .await?;

        Ok(into_candidates(page))
    }

    async fn author_papers(
        &self,
        author_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Publication>, ApiError> {
        let url = format!("{}/author/{}/papers", self.base_url, author_id);
        debug!("Fetching papers for {} at offset {}", author_id, offset);

        let page: Page<PaperData> = self
            .get(
                &url,
                &[
                    ("offset", offset.to_string()),
                    ("limit", limit.to_string()),
                    ("fields", PAPER_FIELDS.to_string()),
                ],
            )
            .await?;

        Ok(page.data.into_iter().map(Publication::from).collect())
    }
}
