//! Cross-session log of measurement IDs.
//!
//! Each session appends the ID of its first run, one per line, to
//! `<cache_dir>/globalping/measurements`. Previous IDs can be referenced as
//! probe locations (`@1`, `@-1`, `first`, `last`).

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors resolving a measurement reference
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to read measurement log: {0}")]
    Io(#[from] io::Error),
    #[error("no previous measurements found")]
    Empty,
    #[error("measurement reference {0} is out of range")]
    OutOfRange(String),
}

/// Append-only store of measurement IDs
pub trait MeasurementLog {
    fn append(&mut self, id: &str) -> io::Result<()>;
}

/// Measurement log backed by a newline-separated file
#[derive(Debug, Clone)]
pub struct FileMeasurementLog {
    path: PathBuf,
}

impl FileMeasurementLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: ~/.cache/globalping/measurements
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|p| p.join("globalping").join("measurements"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All logged IDs, oldest first. A missing file reads as empty.
    pub fn ids(&self) -> io::Result<Vec<String>> {
        match fs::read_to_string(&self.path) {
            Ok(s) => Ok(s
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Resolve a location reference to a logged ID.
    ///
    /// Returns `Ok(None)` when `reference` is not a reference at all, so the
    /// caller can treat it as a literal location.
    pub fn resolve(&self, reference: &str) -> Result<Option<String>, LogError> {
        let Some(index) = parse_reference(reference) else {
            return Ok(None);
        };

        let ids = self.ids()?;
        if ids.is_empty() {
            return Err(LogError::Empty);
        }

        let pos = if index > 0 {
            Some((index - 1) as usize)
        } else {
            ids.len().checked_sub(index.unsigned_abs() as usize)
        };

        pos.and_then(|p| ids.get(p))
            .cloned()
            .map(Some)
            .ok_or_else(|| LogError::OutOfRange(reference.to_string()))
    }
}

impl MeasurementLog for FileMeasurementLog {
    fn append(&mut self, id: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", id)
    }
}

/// `first`/`@1` → 1, `last`/`@-1` → -1, `@N` → N. Zero is not a valid index.
fn parse_reference(s: &str) -> Option<i64> {
    match s {
        "first" => Some(1),
        "last" | "previous" => Some(-1),
        _ => s
            .strip_prefix('@')
            .and_then(|n| n.parse::<i64>().ok())
            .filter(|n| *n != 0),
    }
}
