//! Per-researcher collection pipeline.
//!
//! Each researcher moves through resolve, fetch, aggregate, and write, one
//! at a time. A failure at any stage is logged and the run moves on to the
//! next researcher.

pub mod fetcher;
pub mod resolver;

pub use fetcher::PublicationFetcher;
pub use resolver::AuthorResolver;

use crate::analysis::aggregate;
use crate::api::{ApiError, ScholarApi};
use crate::models::{ResearcherRecord, ResultRow};
use crate::sink::ResultSink;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a single researcher could not be processed.
#[derive(Debug, Error)]
pub enum ResearcherError {
    /// The author search returned no candidates.
    #[error("no author matches {name:?}")]
    NoMatch { name: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("author cache: {0:#}")]
    Cache(anyhow::Error),
}

/// Result of processing one researcher.
#[derive(Debug)]
pub enum Outcome {
    /// Already in the result table.
    Skipped,
    Written(ResultRow),
    NoMatch,
    Failed(ResearcherError),
}

/// Counts for a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub written: usize,
    pub skipped: usize,
    pub no_match: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl RunSummary {
    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Written(_) => self.written += 1,
            Outcome::NoMatch => self.no_match += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Pipeline settings not owned by a stage.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Pause after each researcher that needed the API.
    pub researcher_delay: Duration,
    pub show_progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            researcher_delay: Duration::from_secs(1),
            show_progress: true,
        }
    }
}

pub struct Pipeline<A> {
    api: A,
    resolver: AuthorResolver,
    fetcher: PublicationFetcher,
    sink: ResultSink,
    options: PipelineOptions,
}

impl<A: ScholarApi> Pipeline<A> {
    pub fn new(
        api: A,
        resolver: AuthorResolver,
        fetcher: PublicationFetcher,
        sink: ResultSink,
        options: PipelineOptions,
    ) -> Self {
        Self {
            api,
            resolver,
            fetcher,
            sink,
            options,
        }
    }

    /// Process every record in order.
    ///
    /// Only a failure to write the result table stops the run.
    pub async fn run(&mut self, records: &[ResearcherRecord]) -> Result<RunSummary> {
        let start = Instant::now();
        let mut summary = RunSummary {
            total: records.len(),
            ..RunSummary::default()
        };

        let progress = self.progress_bar(records.len() as u64);

        for record in records {
            progress.set_message(record.name.clone());

            let outcome = self.process(record).await?;
            match &outcome {
                Outcome::Skipped => {}
                Outcome::Written(row) => info!(
                    "{}: {} pubs, {} citations",
                    row.name, row.publication_count_6yr, row.citation_total_6yr
                ),
                Outcome::NoMatch => warn!("No match found for {}", record.name),
                Outcome::Failed(e) => warn!("Error with {}: {}", record.name, e),
            }
            summary.record(&outcome);
            progress.inc(1);

            if !matches!(outcome, Outcome::Skipped) && !self.options.researcher_delay.is_zero() {
                tokio::time::sleep(self.options.researcher_delay).await;
            }
        }

        progress.finish_and_clear();
        summary.duration = start.elapsed();
        Ok(summary)
    }

    /// Move one researcher through resolve, fetch, aggregate, and write.
    pub async fn process(&mut self, record: &ResearcherRecord) -> Result<Outcome> {
        if self.sink.contains(&record.name) {
            return Ok(Outcome::Skipped);
        }

        let row = match self.collect(record).await {
            Ok(row) => row,
            Err(ResearcherError::NoMatch { .. }) => return Ok(Outcome::NoMatch),
            Err(e) => return Ok(Outcome::Failed(e)),
        };

        self.sink.write(&row)?;
        Ok(Outcome::Written(row))
    }

    async fn collect(&mut self, record: &ResearcherRecord) -> Result<ResultRow, ResearcherError> {
        let author_id = self.resolver.resolve(&self.api, &record.name).await?;
        let publications = self.fetcher.fetch_all(&self.api, &author_id).await?;
        for undated in publications.iter().filter(|p| p.year.is_none()) {
            debug!(
                "Undated publication for {}: {}",
                record.name,
                undated.title.as_deref().unwrap_or("(untitled)")
            );
        }
        let metrics = aggregate(&publications, record.grant_year);

        Ok(ResultRow {
            name: record.name.clone(),
            grant_year: record.grant_year,
            grant_amount: record.grant_amount,
            publication_count_6yr: metrics.publications,
            citation_total_6yr: metrics.citations,
        })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }

    /// Consume the pipeline, returning the API client.
    #[cfg(test)]
    fn into_api(self) -> A {
        self.api
    }
}
