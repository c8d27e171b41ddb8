//! Tree-sitter parser wrapper

use super::language::Language;
use crate::error::{Error, Result};
use tree_sitter::{Language as TsLanguage, Parser, Tree};

/// Parse source code into a tree-sitter AST.
///
/// A new `Parser` is built for every call so that no parser state is shared
/// between concurrent chunking tasks.
pub fn parse(source: &str, language: Language, path: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    let ts_language = get_tree_sitter_language(language);
    parser
        .set_language(&ts_language)
        .map_err(|e| Error::parse(path, e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| Error::parse(path, "parser returned no tree"))
}

fn get_tree_sitter_language(language: Language) -> TsLanguage {
    match language {
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Markdown => tree_sitter_md::LANGUAGE.into(),
    }
}
