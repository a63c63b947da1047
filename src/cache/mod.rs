//! Persistent author-ID cache.
//!
//! Maps normalized researcher names to Semantic Scholar author IDs. The
//! whole map is rewritten on every insert through a temporary file in the
//! same directory followed by a rename, so the file on disk is always a
//! complete snapshot.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

pub struct AuthorCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl AuthorCache {
    /// Open the cache at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read author cache: {}", path.display()))?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).with_context(|| {
                    format!("Failed to parse author cache: {}", path.display())
                })?
            }
        } else {
            BTreeMap::new()
        };

        debug!("Loaded {} cached authors from {}", entries.len(), path.display());
        Ok(Self { path, entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Insert or replace an entry and persist the cache before returning.
    pub fn insert(&mut self, key: &str, author_id: &str) -> Result<()> {
        let previous = self
            .entries
            .insert(key.to_string(), author_id.to_string());

        if let Err(e) = self.persist() {
            // Keep memory consistent with what is on disk.
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key),
            };
            return Err(e);
        }

        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut tmp, &self.entries)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .with_context(|| format!("Failed to write author cache: {}", self.path.display()))?;

        Ok(())
    }
}
