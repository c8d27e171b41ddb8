//! Supported source languages

use std::path::Path;

/// Closed set of languages with a structural chunker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    Rust,
    Markdown,
}

impl Language {
    pub const ALL: [Language; 3] = [Self::Python, Self::Rust, Self::Markdown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Rust => "rust",
            Self::Markdown => "markdown",
        }
    }

    /// File extensions (lower-case, without dot) claimed by this language
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Python => &["py", "pyi"],
            Self::Rust => &["rs"],
            Self::Markdown => &["md", "markdown"],
        }
    }
}

/// Lower-cased extension of a path, if any
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// File stem used as the name of module chunks
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
