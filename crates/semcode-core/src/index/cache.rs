//! File change detection for incremental indexing

use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};

pub const CACHE_FILENAME: &str = "file_mtimes.json";

/// Classification of discovered files against the cache
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileChanges {
    pub new: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
}

impl FileChanges {
    pub fn has_changes(&self) -> bool {
        !(self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty())
    }

    /// Files that must be (re-)chunked this pass
    pub fn to_process(&self) -> impl Iterator<Item = &String> {
        self.new.iter().chain(self.modified.iter())
    }
}

/// Per-project map of file path to last indexed modification time.
///
/// Times are whole nanoseconds since the epoch so they compare exactly after a
/// round trip through JSON.
#[derive(Debug, Clone)]
pub struct ChangeCache {
    path: PathBuf,
    mtimes: BTreeMap<String, u64>,
}

impl ChangeCache {
    /// Load the cache stored in `index_dir`; a missing or corrupt file reads as empty
    pub fn load(index_dir: &Path) -> Self {
        let path = index_dir.join(CACHE_FILENAME);
        let mtimes = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(mtimes) => mtimes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "change cache is corrupt, starting over");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no change cache yet");
                BTreeMap::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "change cache unreadable, starting over");
                BTreeMap::new()
            }
        };
        Self { path, mtimes }
    }

    pub fn exists(index_dir: &Path) -> bool {
        index_dir.join(CACHE_FILENAME).is_file()
    }

    /// Remove the cache stored in `index_dir`, so the next pass sees every file as new
    pub fn discard(index_dir: &Path) -> Result<()> {
        match std::fs::remove_file(index_dir.join(CACHE_FILENAME)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.mtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mtimes.is_empty()
    }

    pub fn mtime(&self, file: &str) -> Option<u64> {
        self.mtimes.get(file).copied()
    }

    pub fn tracked_files(&self) -> impl Iterator<Item = &String> {
        self.mtimes.keys()
    }

    /// Compare discovered `(path, mtime)` pairs with the cached state
    pub fn classify(&self, current: &[(String, u64)]) -> FileChanges {
        let mut changes = FileChanges::default();

        for (file, mtime) in current {
            match self.mtimes.get(file) {
                None => changes.new.push(file.clone()),
                Some(cached) if *cached != *mtime => changes.modified.push(file.clone()),
                Some(_) => changes.unchanged.push(file.clone()),
            }
        }

        let current_set: std::collections::HashSet<&str> =
            current.iter().map(|(f, _)| f.as_str()).collect();
        changes.deleted = self
            .mtimes
            .keys()
            .filter(|f| !current_set.contains(f.as_str()))
            .cloned()
            .collect();

        changes
    }

    /// Supersede every entry; files absent from `mtimes` are pruned
    pub fn replace(&mut self, mtimes: BTreeMap<String, u64>) {
        self.mtimes = mtimes;
    }

    /// Write to a temp file in the same directory, then rename over the cache
    pub fn save(&self) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, &self.mtimes)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(files = self.mtimes.len(), "change cache saved");
        Ok(())
    }
}

/// Modification time of a file in nanoseconds since the epoch
pub fn file_mtime(path: &Path) -> Result<u64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0);
    Ok(nanos)
}

/// Nanosecond mtime as fractional seconds, the form stored with chunks
pub fn mtime_secs(nanos: u64) -> f64 {
    nanos as f64 / 1e9
}
