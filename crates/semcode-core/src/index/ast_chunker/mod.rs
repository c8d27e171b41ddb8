//! AST-aware structural chunking
//!
//! This module splits source files into typed, named, line-ranged chunks using
//! tree-sitter. Each supported language has a dedicated strategy; the
//! [`ChunkerRegistry`] picks one by file extension.

pub mod language;
pub mod parser;
pub mod registry;
pub mod strategies;
pub mod types;

pub use language::Language;
pub use registry::ChunkerRegistry;
pub use strategies::{
    ChunkingStrategy, LanguageStrategy, MarkdownStrategy, PythonStrategy, RustStrategy,
    SourceFile,
};
pub use types::{compute_chunk_id, Chunk, ChunkKind};

use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Chunk one file's source text with the strategy for `language`.
///
/// Empty or whitespace-only input yields no chunks. A tree whose root is an
/// error node is reported as a parse failure.
pub fn chunk_source(source: &str, path: &Path, language: Language) -> Result<Vec<Chunk>> {
    if source.trim().is_empty() {
        return Ok(Vec::new());
    }

    let shown = path.to_string_lossy();
    let tree = parser::parse(source, language, &shown)?;
    let root = tree.root_node();

    if root.is_error() {
        return Err(Error::parse(shown, "source could not be parsed"));
    }
    if root.has_error() {
        debug!(
            path = %shown,
            language = language.as_str(),
            "syntax errors in source, chunking recovered nodes"
        );
    }

    let file = SourceFile::new(source, path, language);
    LanguageStrategy::for_language(language).extract_chunks(&file, root)
}
