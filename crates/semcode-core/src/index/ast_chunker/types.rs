//! Core types for structural chunking

use serde::{Deserialize, Serialize};

/// Kind of structural unit extracted from a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// File-leading documentation (docstring, `//!` block, unheaded markdown)
    Module,
    Function,
    /// Classes and type-level items (struct, enum, trait, impl)
    Class,
    Method,
    /// Documentation section under one heading
    Section,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Function => "function",
            Self::Class => "class",
            Self::Method => "method",
            Self::Section => "section",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "module" => Some(Self::Module),
            "function" => Some(Self::Function),
            "class" => Some(Self::Class),
            "method" => Some(Self::Method),
            "section" => Some(Self::Section),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed, line-ranged unit of source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub file_path: String,
    pub kind: ChunkKind,
    /// Symbol name, or the file stem for module chunks
    pub name: String,
    /// Verbatim source lines `line_start..=line_end`
    pub content: String,
    /// 1-indexed, inclusive
    pub line_start: usize,
    /// 1-indexed, inclusive
    pub line_end: usize,
    pub language: String,
}

impl Chunk {
    /// Stable identity used as the store key
    pub fn id(&self) -> String {
        compute_chunk_id(&self.file_path, self.kind, &self.name, self.line_start)
    }

    pub fn line_count(&self) -> usize {
        self.line_end - self.line_start + 1
    }
}

/// blake3 over (path, kind, name, line_start), truncated to 32 hex chars
pub fn compute_chunk_id(file_path: &str, kind: ChunkKind, name: &str, line_start: usize) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(file_path.as_bytes());
    hasher.update(&[0]);
    hasher.update(kind.as_str().as_bytes());
    hasher.update(&[0]);
    hasher.update(name.as_bytes());
    hasher.update(&[0]);
    hasher.update(&(line_start as u64).to_le_bytes());
    let hash = hasher.finalize();
    hash.to_hex()[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(name: &str, line_start: usize) -> Chunk {
        Chunk {
            file_path: "/p/src/lib.rs".to_string(),
            kind: ChunkKind::Function,
            name: name.to_string(),
            content: "fn a() {}".to_string(),
            line_start,
            line_end: line_start,
            language: "rust".to_string(),
        }
    }

    #[test]
    fn test_chunk_id_stability() {
        assert_eq!(chunk("a", 3).id(), chunk("a", 3).id());
        assert_eq!(chunk("a", 3).id().len(), 32);
    }

    #[test]
    fn test_chunk_id_ignores_content() {
        let mut changed = chunk("a", 3);
        changed.content = "fn a() { todo!() }".to_string();
        assert_eq!(changed.id(), chunk("a", 3).id());
    }

    #[test]
    fn test_chunk_id_key_fields_matter() {
        assert_ne!(chunk("a", 3).id(), chunk("b", 3).id());
        assert_ne!(chunk("a", 3).id(), chunk("a", 4).id());
        let mut method = chunk("a", 3);
        method.kind = ChunkKind::Method;
        assert_ne!(method.id(), chunk("a", 3).id());
    }

    #[test]
    fn test_kind_roundtrip_names() {
        for kind in [
            ChunkKind::Module,
            ChunkKind::Function,
            ChunkKind::Class,
            ChunkKind::Method,
            ChunkKind::Section,
        ] {
            assert_eq!(ChunkKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChunkKind::parse("struct"), None);
    }
}
