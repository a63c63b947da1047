//! Grant table reader.
//!
//! This module reads researcher rows from a delimited export of the grant
//! spreadsheet, extracting the grant year and amount from their display
//! formats.

use crate::config::InputConfig;
use crate::models::ResearcherRecord;
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a single input row was rejected.
#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("empty name")]
    EmptyName,
    #[error("no 4-digit year in {0:?}")]
    MissingYear(String),
    #[error("no amount in {0:?}")]
    MissingAmount(String),
    #[error("column {0} is not valid UTF-8")]
    InvalidEncoding(usize),
}

fn year_pattern() -> &'static Regex {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    YEAR.get_or_init(|| Regex::new(r"\d{4}").expect("valid year pattern"))
}

fn amount_pattern() -> &'static Regex {
    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    AMOUNT.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").expect("valid amount pattern"))
}

/// Extract the first 4-digit year from a fiscal-year range such as "2020–2021".
pub fn parse_grant_year(fiscal_year: &str) -> Result<i32, RowError> {
    year_pattern()
        .find(fiscal_year)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| RowError::MissingYear(fiscal_year.to_string()))
}

/// Parse a currency-formatted amount such as "$45,000".
pub fn parse_amount(amount: &str) -> Result<f64, RowError> {
    let stripped = amount.replace(',', "");
    amount_pattern()
        .find(&stripped)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| RowError::MissingAmount(amount.to_string()))
}

/// Build a record from the three raw column values.
pub fn parse_record(
    name: &str,
    fiscal_year: &str,
    amount: &str,
) -> Result<ResearcherRecord, RowError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RowError::EmptyName);
    }

    Ok(ResearcherRecord {
        name: name.to_string(),
        grant_year: parse_grant_year(fiscal_year)?,
        grant_amount: parse_amount(amount)?,
    })
}

/// Reads researcher records from a delimited table.
pub struct RowSource {
    config: InputConfig,
}

impl RowSource {
    pub fn new(config: InputConfig) -> Self {
        Self { config }
    }

    /// Read every usable record from a file.
    pub fn read_path(&self, path: &Path) -> Result<Vec<ResearcherRecord>> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open input table: {}", path.display()))?;
        self.read(file)
            .with_context(|| format!("Failed to read input table: {}", path.display()))
    }

    /// Read every usable record. Malformed rows are logged and skipped.
    pub fn read<R: std::io::Read>(&self, reader: R) -> Result<Vec<ResearcherRecord>> {
        let delimiter = u8::try_from(self.config.delimiter)
            .context("Delimiter must be a single-byte character")?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let column = |wanted: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim() == wanted)
                .ok_or_else(|| anyhow::anyhow!("Missing column {:?}", wanted))
        };
        let name_idx = column(&self.config.name_column)?;
        let year_idx = column(&self.config.year_column)?;
        let amount_idx = column(&self.config.amount_column)?;

        let mut records = Vec::new();
        for (line, row) in reader.byte_records().enumerate() {
            // +2: header line, and 1-indexed
            let line = line + 2;
            let row = match row {
                Ok(row) => row,
                Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping input row {}: {}", line, e);
                    continue;
                }
            };

            match record_from(&row, name_idx, year_idx, amount_idx) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping input row {}: {}", line, e),
            }
        }

        debug!("Read {} records", records.len());

        if self.config.first_grant_only {
            records = keep_first_grant(records);
        }

        Ok(records)
    }
}

fn record_from(
    row: &csv::ByteRecord,
    name_idx: usize,
    year_idx: usize,
    amount_idx: usize,
) -> Result<ResearcherRecord, RowError> {
    let field = |idx: usize| -> Result<&str, RowError> {
        match row.get(idx) {
            Some(bytes) => std::str::from_utf8(bytes).map_err(|_| RowError::InvalidEncoding(idx)),
            None => Ok(""),
        }
    };

    parse_record(field(name_idx)?, field(year_idx)?, field(amount_idx)?)
}

/// Keep only the earliest grant per name, in order of first appearance.
pub fn keep_first_grant(records: Vec<ResearcherRecord>) -> Vec<ResearcherRecord> {
    let mut kept: Vec<ResearcherRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        match index.get(&record.name) {
            Some(&i) => {
                if record.grant_year < kept[i].grant_year {
                    kept[i] = record;
                }
            }
            None => {
                index.insert(record.name.clone(), kept.len());
                kept.push(record);
            }
        }
    }

    kept
}
