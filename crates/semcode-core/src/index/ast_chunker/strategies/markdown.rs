//! Markdown chunking strategy
//!
//! Sections nest by heading level in the tree. Every heading yields one chunk
//! holding only its own text, up to its first sub-section; sub-sections are
//! emitted as separate chunks. Text before the first heading becomes a module
//! chunk named after the file.

use super::{node_rows, ChunkingStrategy, SourceFile};
use crate::error::Result;
use crate::index::ast_chunker::language::Language;
use crate::index::ast_chunker::types::{Chunk, ChunkKind};
use tree_sitter::Node;

#[derive(Debug, Clone, Copy)]
pub struct MarkdownStrategy;

impl ChunkingStrategy for MarkdownStrategy {
    fn language(&self) -> Language {
        Language::Markdown
    }

    fn extract_chunks(&self, source: &SourceFile<'_>, root: Node) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        extract_container(source, root, &mut chunks);
        Ok(chunks)
    }
}

/// Emit the direct content of `container`, then recurse into its sections
fn extract_container(source: &SourceFile<'_>, container: Node, chunks: &mut Vec<Chunk>) {
    let mut cursor = container.walk();
    let children: Vec<Node> = container.named_children(&mut cursor).collect();

    let heading = children
        .iter()
        .copied()
        .find(|c| matches!(c.kind(), "atx_heading" | "setext_heading"));

    let own_end = children
        .iter()
        .find(|c| c.kind() == "section")
        .map(|s| s.start_position().row);

    let (start, end) = node_rows(container);
    let end = match own_end {
        Some(row) if row > start => row - 1,
        Some(_) => start,
        None => end,
    };
    let has_own_content = own_end.map_or(true, |row| row > start);

    if has_own_content {
        let (kind, name) = match heading {
            Some(h) => (ChunkKind::Section, heading_text(source, h)),
            None => (ChunkKind::Module, source.stem.clone()),
        };
        push_trimmed(source, kind, &name, start, end, chunks);
    }

    for child in children.into_iter().filter(|c| c.kind() == "section") {
        extract_container(source, child, chunks);
    }
}

/// Push a chunk without its trailing blank lines; all-blank spans are skipped
fn push_trimmed(
    source: &SourceFile<'_>,
    kind: ChunkKind,
    name: &str,
    start: usize,
    mut end: usize,
    chunks: &mut Vec<Chunk>,
) {
    while end > start && source.line(end).trim().is_empty() {
        end -= 1;
    }
    if source.line(end).trim().is_empty() {
        return;
    }
    chunks.push(source.chunk(kind, name, start, end));
}

/// ATX text sits in an `inline` child, setext text in `paragraph > inline`
fn heading_text(source: &SourceFile<'_>, heading: Node) -> String {
    let mut cursor = heading.walk();
    let inline = heading.named_children(&mut cursor).find_map(|child| match child.kind() {
        "inline" => Some(child),
        "paragraph" => {
            let mut inner = child.walk();
            let found = child
                .named_children(&mut inner)
                .find(|c| c.kind() == "inline");
            found
        }
        _ => None,
    });

    match inline {
        Some(node) => source.node_text(node).trim().to_string(),
        None => source
            .line(heading.start_position().row)
            .trim_start_matches('#')
            .trim()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ast_chunker::parser::parse;
    use std::path::Path;

    fn chunk(text: &str) -> Vec<Chunk> {
        let tree = parse(text, Language::Markdown, "GUIDE.md").unwrap();
        let source = SourceFile::new(text, Path::new("/p/GUIDE.md"), Language::Markdown);
        MarkdownStrategy
            .extract_chunks(&source, tree.root_node())
            .unwrap()
    }

    #[test]
    fn test_sections_are_flattened() {
        let text = "\
# Guide

Intro text.

## Install

Run it.

## Usage

Call it.
";
        let chunks = chunk(text);
        let summary: Vec<(ChunkKind, &str, usize, usize)> = chunks
            .iter()
            .map(|c| (c.kind, c.name.as_str(), c.line_start, c.line_end))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ChunkKind::Section, "Guide", 1, 3),
                (ChunkKind::Section, "Install", 5, 7),
                (ChunkKind::Section, "Usage", 9, 11),
            ]
        );
        assert!(!chunks[0].content.contains("Run it."));
    }

    #[test]
    fn test_preamble_becomes_module_chunk() {
        let text = "Some preamble.\n\n# Title\n\nBody.\n";
        let chunks = chunk(text);
        assert_eq!(chunks[0].kind, ChunkKind::Module);
        assert_eq!(chunks[0].name, "GUIDE");
        assert_eq!(chunks[0].content, "Some preamble.");
        assert_eq!(chunks[1].name, "Title");
    }

    #[test]
    fn test_heading_directly_followed_by_subsection() {
        let text = "# Top\n## Child\n\nText.\n";
        let chunks = chunk(text);
        assert_eq!(chunks[0].name, "Top");
        assert_eq!((chunks[0].line_start, chunks[0].line_end), (1, 1));
        assert_eq!(chunks[1].name, "Child");
        assert_eq!((chunks[1].line_start, chunks[1].line_end), (2, 4));
    }

    #[test]
    fn test_setext_heading() {
        let text = "Title\n=====\n\nBody.\n";
        let chunks = chunk(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Section);
        assert_eq!(chunks[0].name, "Title");
    }
}
