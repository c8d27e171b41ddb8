//! Semcode Core Library
//!
//! Semantic code search over a local source tree.
//!
//! # Features
//! - Structural chunking of Python, Rust and Markdown via tree-sitter
//! - Incremental indexing driven by file modification times
//! - SQLite storage with FTS5 keyword search and cosine vector search
//! - Hybrid ranking with exact-match and recency boosts

pub mod config;
pub mod context;
pub mod db;
pub mod embedding;
pub mod error;
pub mod index;
pub mod search;

pub use config::{EmbeddingBackend, EmbeddingConfig, RankingConfig, Settings};
pub use context::{AppContext, IndexStatus};
pub use db::{EmbeddingRecord, ScoredChunk, SqliteStore, VectorStore};
pub use embedding::{Embedder, HashEmbedder, HttpEmbedder, LazyEmbedder};
pub use error::{Error, Result, SemcodeError};
pub use index::{
    Chunk, ChunkKind, ChunkerRegistry, IndexProgress, IndexReport, IndexStage, Indexer,
    IndexerOptions, Language, ProgressCallback,
};
pub use search::{
    HybridSearcher, SearchOptions, SearchOutcome, SearchResult, SearchSource, SearchTimings,
};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "semcode";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "semcode";
