//! Result table writer.
//!
//! Rows are keyed by researcher name: names already present in the table
//! when it is opened, or written since, are never written again. Each row
//! is flushed as soon as it is written so an interrupted run keeps its
//! progress.

use crate::models::ResultRow;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct ResultSink {
    path: PathBuf,
    writer: csv::Writer<File>,
    written: HashSet<String>,
}

impl ResultSink {
    /// Open the table for appending, writing the header if it is new or empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let existing = if path.exists() {
            read_rows(&path)?
                .into_iter()
                .map(|row| row.name)
                .collect()
        } else {
            HashSet::new()
        };
        let needs_header = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open result table: {}", path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(ResultRow::HEADER)?;
            writer.flush()?;
        }

        debug!(
            "Result table {} already holds {} researchers",
            path.display(),
            existing.len()
        );

        Ok(Self {
            path,
            writer,
            written: existing,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.written.contains(name)
    }

    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write and flush a row. Returns `false` if the name was already present.
    pub fn write(&mut self, row: &ResultRow) -> Result<bool> {
        if self.written.contains(&row.name) {
            return Ok(false);
        }

        self.writer
            .serialize(row)
            .with_context(|| format!("Failed to write row for {}", row.name))?;
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;

        self.written.insert(row.name.clone());
        Ok(true)
    }
}

/// Read every row of a result table. Malformed rows are logged and skipped.
pub fn read_rows(path: &Path) -> Result<Vec<ResultRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open result table: {}", path.display()))?;

    let mut rows = Vec::new();
    for (index, row) in reader.deserialize::<ResultRow>().enumerate() {
        match row {
            Ok(row) => rows.push(row),
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
            Err(e) => {
                // +2: header line, and 1-indexed
                let line = e.position().map_or(index as u64 + 2, |p| p.line());
                warn!("Skipping result row {} in {}: {}", line, path.display(), e);
            }
        }
    }

    Ok(rows)
}
