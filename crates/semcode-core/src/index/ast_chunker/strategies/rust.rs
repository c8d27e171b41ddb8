//! Rust-specific chunking strategy

use super::{field_text, node_rows, ChunkingStrategy, SourceFile};
use crate::error::Result;
use crate::index::ast_chunker::language::Language;
use crate::index::ast_chunker::types::{Chunk, ChunkKind};
use tree_sitter::Node;

/// Items chunked as type-level units
const TYPE_ITEMS: &[&str] = &[
    "struct_item",
    "enum_item",
    "union_item",
    "type_item",
    "trait_item",
];

#[derive(Debug, Clone, Copy)]
pub struct RustStrategy;

impl ChunkingStrategy for RustStrategy {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn extract_chunks(&self, source: &SourceFile<'_>, root: Node) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();

        if let Some((start, end)) = module_doc_rows(source, root) {
            chunks.push(source.chunk(ChunkKind::Module, &source.stem, start, end));
        }

        walk_items(source, root, &mut chunks);
        Ok(chunks)
    }
}

/// Rows of the leading `//!` / `/*! */` block, skipping plain comments and `#![..]`
fn module_doc_rows(source: &SourceFile<'_>, root: Node) -> Option<(usize, usize)> {
    let mut span: Option<(usize, usize)> = None;
    let mut cursor = root.walk();

    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "line_comment" | "block_comment" if is_inner_doc(source.node_text(child)) => {
                let (start, end) = node_rows(child);
                span = Some(match span {
                    Some((first, _)) => (first, end),
                    None => (start, end),
                });
            }
            "line_comment" | "block_comment" | "inner_attribute_item" => continue,
            _ => break,
        }
    }

    span
}

fn is_inner_doc(text: &str) -> bool {
    text.starts_with("//!") || text.starts_with("/*!")
}

fn is_outer_doc(text: &str) -> bool {
    (text.starts_with("///") && !text.starts_with("////"))
        || (text.starts_with("/**") && !text.starts_with("/***") && text != "/**/")
}

/// Walk a source file or declaration list.
///
/// Attributes and `///` docs directly above an item are folded into its span.
fn walk_items(source: &SourceFile<'_>, parent: Node, chunks: &mut Vec<Chunk>) {
    let mut prefix_start: Option<usize> = None;
    let mut cursor = parent.walk();

    for child in parent.named_children(&mut cursor) {
        let kind = child.kind();
        let is_prefix = kind == "attribute_item"
            || (matches!(kind, "line_comment" | "block_comment")
                && is_outer_doc(source.node_text(child)));

        if is_prefix {
            prefix_start.get_or_insert(child.start_position().row);
            continue;
        }

        let (item_start, item_end) = node_rows(child);
        let start = prefix_start.take().unwrap_or(item_start);

        match kind {
            "function_item" => {
                let in_body = parent.kind() == "declaration_list"
                    && parent.parent().is_some_and(|p| p.kind() != "mod_item");
                let kind = if in_body {
                    ChunkKind::Method
                } else {
                    ChunkKind::Function
                };
                if let Some(name) = field_text(source, child, "name") {
                    chunks.push(source.chunk(kind, name, start, item_end));
                }
            }
            k if TYPE_ITEMS.contains(&k) => {
                if let Some(name) = field_text(source, child, "name") {
                    chunks.push(source.chunk(ChunkKind::Class, name, start, item_end));
                }
                if k == "trait_item" {
                    walk_body(source, child, chunks);
                }
            }
            "impl_item" => {
                if let Some(name) = impl_name(source, child) {
                    chunks.push(source.chunk(ChunkKind::Class, &name, start, item_end));
                }
                walk_body(source, child, chunks);
            }
            "mod_item" => walk_body(source, child, chunks),
            _ => {}
        }
    }
}

fn walk_body(source: &SourceFile<'_>, item: Node, chunks: &mut Vec<Chunk>) {
    if let Some(body) = item.child_by_field_name("body") {
        walk_items(source, body, chunks);
    }
}

/// `Type` for inherent impls, `Trait for Type` for trait impls
fn impl_name(source: &SourceFile<'_>, node: Node) -> Option<String> {
    let ty = field_text(source, node, "type")?;
    Some(match field_text(source, node, "trait") {
        Some(tr) => format!("{} for {}", tr, ty),
        None => ty.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ast_chunker::parser::parse;
    use std::path::Path;

    fn chunk(text: &str) -> Vec<Chunk> {
        let tree = parse(text, Language::Rust, "lib.rs").unwrap();
        let source = SourceFile::new(text, Path::new("/p/src/lib.rs"), Language::Rust);
        RustStrategy.extract_chunks(&source, tree.root_node()).unwrap()
    }

    fn summary(chunks: &[Chunk]) -> Vec<(ChunkKind, String, usize, usize)> {
        chunks
            .iter()
            .map(|c| (c.kind, c.name.clone(), c.line_start, c.line_end))
            .collect()
    }

    #[test]
    fn test_module_doc_comment() {
        let text = "// license\n//! Config loading.\n//! Second line.\n\nuse std::fs;\n";
        let chunks = chunk(text);
        assert_eq!(chunks[0].kind, ChunkKind::Module);
        assert_eq!(chunks[0].name, "lib");
        assert_eq!((chunks[0].line_start, chunks[0].line_end), (2, 3));
        assert_eq!(chunks[0].content, "//! Config loading.\n//! Second line.");
    }

    #[test]
    fn test_no_module_doc_after_item() {
        let chunks = chunk("use std::fs;\n//! late\n");
        assert!(chunks.iter().all(|c| c.kind != ChunkKind::Module));
    }

    #[test]
    fn test_attributes_and_docs_in_span() {
        let text = "\
/// A point.
#[derive(Debug)]
pub struct Point {
    x: i32,
}

/// Parse it.
fn parse_config() {}
";
        let chunks = chunk(text);
        assert_eq!(
            summary(&chunks),
            vec![
                (ChunkKind::Class, "Point".to_string(), 1, 5),
                (ChunkKind::Function, "parse_config".to_string(), 7, 8),
            ]
        );
        assert!(chunks[0].content.starts_with("/// A point."));
    }

    #[test]
    fn test_impl_blocks_and_methods() {
        let text = "\
impl Point {
    pub fn new() -> Self {
        Point { x: 0 }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        Ok(())
    }
}
";
        let chunks = chunk(text);
        assert_eq!(
            summary(&chunks),
            vec![
                (ChunkKind::Class, "Point".to_string(), 1, 5),
                (ChunkKind::Method, "new".to_string(), 2, 4),
                (ChunkKind::Class, "std::fmt::Display for Point".to_string(), 7, 11),
                (ChunkKind::Method, "fmt".to_string(), 8, 10),
            ]
        );
    }

    #[test]
    fn test_trait_default_methods() {
        let text = "\
trait Loader {
    fn path(&self) -> String;

    fn load(&self) -> String {
        self.path()
    }
}
";
        let chunks = chunk(text);
        assert_eq!(chunks[0].kind, ChunkKind::Class);
        assert_eq!(chunks[0].name, "Loader");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].kind, ChunkKind::Method);
        assert_eq!(chunks[1].name, "load");
    }

    #[test]
    fn test_inline_module_items() {
        let text = "mod inner {\n    pub fn helper() {}\n}\n";
        let chunks = chunk(text);
        assert_eq!(
            summary(&chunks),
            vec![(ChunkKind::Function, "helper".to_string(), 2, 2)]
        );
    }
}
