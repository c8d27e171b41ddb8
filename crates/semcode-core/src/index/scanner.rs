//! File scanning for indexing

use crate::error::Result;
use glob::Pattern;
use std::path::{Path, PathBuf};

/// Directories never descended into, gitignore or not
const EXCLUDE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".venv",
    "venv",
    "__pycache__",
    ".pytest_cache",
    "target",
    "dist",
    "build",
];

/// Scan options
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Extensions (lower-case, no dot) to keep
    pub extensions: Vec<String>,
    /// Glob patterns matched against the path relative to the root
    pub ignore_patterns: Vec<String>,
    pub use_gitignore: bool,
    pub exclude_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            ignore_patterns: Vec::new(),
            use_gitignore: true,
            exclude_hidden: true,
        }
    }
}

/// Scan `root` for indexable files; returns sorted absolute paths
pub fn scan_files(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    let patterns = options
        .ignore_patterns
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let walker = ignore::WalkBuilder::new(root)
        .hidden(options.exclude_hidden)
        .git_ignore(options.use_gitignore)
        .git_exclude(options.use_gitignore)
        .git_global(false)
        .require_git(false)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            !(is_dir && EXCLUDE_DIRS.iter().any(|d| entry.file_name() == *d))
        })
        .build();

    let mut results = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let matches_ext = super::ast_chunker::language::extension_of(path)
            .is_some_and(|ext| options.extensions.iter().any(|e| *e == ext));
        if !matches_ext {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        if is_ignored(relative, &patterns) {
            continue;
        }

        results.push(path.to_path_buf());
    }

    results.sort();
    Ok(results)
}

/// A path is ignored if it, or any ancestor directory, matches a pattern
fn is_ignored(relative: &Path, patterns: &[Pattern]) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let full = relative.to_string_lossy().replace('\\', "/");
    if patterns.iter().any(|p| p.matches(&full)) {
        return true;
    }

    let file_name = relative
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if patterns.iter().any(|p| p.matches(&file_name)) {
        return true;
    }

    // "dir/**" style patterns against each ancestor prefix
    let mut prefix = String::new();
    for component in relative.parent().into_iter().flat_map(|p| p.components()) {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(&component.as_os_str().to_string_lossy());
        let as_dir = format!("{}/", prefix);
        if patterns
            .iter()
            .any(|p| p.matches(&prefix) || p.matches(&as_dir))
        {
            return true;
        }
    }
    false
}
