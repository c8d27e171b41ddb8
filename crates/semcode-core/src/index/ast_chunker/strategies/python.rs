//! Python-specific chunking strategy

use super::{field_text, node_rows, ChunkingStrategy, SourceFile};
use crate::error::Result;
use crate::index::ast_chunker::language::Language;
use crate::index::ast_chunker::types::{Chunk, ChunkKind};
use tree_sitter::Node;

#[derive(Debug, Clone, Copy)]
pub struct PythonStrategy;

impl ChunkingStrategy for PythonStrategy {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extract_chunks(&self, source: &SourceFile<'_>, root: Node) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();

        if let Some(doc) = module_docstring(root) {
            let (start, end) = node_rows(doc);
            chunks.push(source.chunk(ChunkKind::Module, &source.stem, start, end));
        }

        extract_block(source, root, false, &mut chunks);
        Ok(chunks)
    }
}

/// The module docstring must be the first statement; comments may precede it
fn module_docstring(root: Node) -> Option<Node> {
    let mut cursor = root.walk();
    let first = root
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment")?;

    if first.kind() != "expression_statement" {
        return None;
    }
    let mut inner = first.walk();
    let is_string = first
        .named_children(&mut inner)
        .next()
        .is_some_and(|expr| matches!(expr.kind(), "string" | "concatenated_string"));

    is_string.then_some(first)
}

fn extract_block(source: &SourceFile<'_>, block: Node, in_class: bool, chunks: &mut Vec<Chunk>) {
    let mut cursor = block.walk();
    for child in block.named_children(&mut cursor) {
        match child.kind() {
            "function_definition" => push_function(source, child, child, in_class, chunks),
            "class_definition" => push_class(source, child, child, chunks),
            "decorated_definition" => {
                let Some(definition) = decorated_inner(child) else {
                    continue;
                };
                match definition.kind() {
                    "function_definition" => {
                        push_function(source, child, definition, in_class, chunks)
                    }
                    "class_definition" => push_class(source, child, definition, chunks),
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

/// `span` covers decorators when present; `definition` carries the name
fn push_function(
    source: &SourceFile<'_>,
    span: Node,
    definition: Node,
    in_class: bool,
    chunks: &mut Vec<Chunk>,
) {
    let Some(name) = field_text(source, definition, "name") else {
        return;
    };
    let kind = if in_class {
        ChunkKind::Method
    } else {
        ChunkKind::Function
    };
    let (start, end) = node_rows(span);
    chunks.push(source.chunk(kind, name, start, end));
}

fn push_class(source: &SourceFile<'_>, span: Node, definition: Node, chunks: &mut Vec<Chunk>) {
    let Some(name) = field_text(source, definition, "name") else {
        return;
    };
    let (start, end) = node_rows(span);
    chunks.push(source.chunk(ChunkKind::Class, name, start, end));

    if let Some(body) = definition.child_by_field_name("body") {
        extract_block(source, body, true, chunks);
    }
}

/// Unwrap (possibly nested) decorator wrappers down to the definition
fn decorated_inner(node: Node) -> Option<Node> {
    let definition = node.child_by_field_name("definition")?;
    if definition.kind() == "decorated_definition" {
        decorated_inner(definition)
    } else {
        Some(definition)
    }
}
