//! Language-specific chunking strategies

mod markdown;
mod python;
mod rust;

pub use markdown::MarkdownStrategy;
pub use python::PythonStrategy;
pub use rust::RustStrategy;

use super::language::{file_stem, Language};
use super::types::{Chunk, ChunkKind};
use crate::error::Result;
use std::path::Path;
use tree_sitter::Node;

/// Trait for language-specific structural chunking
pub trait ChunkingStrategy: Send + Sync {
    fn language(&self) -> Language;

    /// Extract chunks, in source order, from an already parsed tree
    fn extract_chunks(&self, source: &SourceFile<'_>, root: Node) -> Result<Vec<Chunk>>;
}

/// Enum-based strategy dispatch to avoid heap allocation
#[derive(Debug, Clone, Copy)]
pub enum LanguageStrategy {
    Python(PythonStrategy),
    Rust(RustStrategy),
    Markdown(MarkdownStrategy),
}

impl LanguageStrategy {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Python => Self::Python(PythonStrategy),
            Language::Rust => Self::Rust(RustStrategy),
            Language::Markdown => Self::Markdown(MarkdownStrategy),
        }
    }

    pub fn language(&self) -> Language {
        match self {
            Self::Python(s) => s.language(),
            Self::Rust(s) => s.language(),
            Self::Markdown(s) => s.language(),
        }
    }

    pub fn extract_chunks(&self, source: &SourceFile<'_>, root: Node) -> Result<Vec<Chunk>> {
        match self {
            Self::Python(s) => s.extract_chunks(source, root),
            Self::Rust(s) => s.extract_chunks(source, root),
            Self::Markdown(s) => s.extract_chunks(source, root),
        }
    }
}

/// Source text split into lines, plus what every chunk of the file shares
pub struct SourceFile<'a> {
    pub text: &'a str,
    pub path: String,
    pub stem: String,
    pub language: Language,
    lines: Vec<&'a str>,
}

impl<'a> SourceFile<'a> {
    pub fn new(text: &'a str, path: &Path, language: Language) -> Self {
        Self {
            text,
            path: path.to_string_lossy().to_string(),
            stem: file_stem(path),
            language,
            // split (not lines) so `\r` survives and spans stay byte-exact
            lines: text.split('\n').collect(),
        }
    }

    pub fn line(&self, row: usize) -> &'a str {
        self.lines.get(row).copied().unwrap_or("")
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn node_text(&self, node: Node) -> &'a str {
        &self.text[node.start_byte()..node.end_byte()]
    }

    /// Build a chunk spanning 0-indexed rows `start_row..=end_row`
    pub fn chunk(&self, kind: ChunkKind, name: &str, start_row: usize, end_row: usize) -> Chunk {
        let last = self.lines.len().saturating_sub(1);
        let end_row = end_row.min(last).max(start_row.min(last));
        let start_row = start_row.min(end_row);
        Chunk {
            file_path: self.path.clone(),
            kind,
            name: name.to_string(),
            content: self.lines[start_row..=end_row].join("\n"),
            line_start: start_row + 1,
            line_end: end_row + 1,
            language: self.language.as_str().to_string(),
        }
    }
}

/// 0-indexed (start, end) rows covered by a node.
///
/// A node whose end position sits at column 0 ends on the previous row.
pub fn node_rows(node: Node) -> (usize, usize) {
    let start = node.start_position().row;
    let end = node.end_position();
    let end_row = if end.column == 0 && end.row > start {
        end.row - 1
    } else {
        end.row
    };
    (start, end_row)
}

/// Text of a named field of a node
pub fn field_text<'a>(source: &SourceFile<'a>, node: Node, field: &str) -> Option<&'a str> {
    node.child_by_field_name(field).map(|n| source.node_text(n))
}
