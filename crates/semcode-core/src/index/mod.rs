//! Indexing pipeline
//!
//! File scanning, structural chunking, change detection, and the pass that
//! ties them to the embedder and the store.

pub mod ast_chunker;
pub mod cache;
mod orchestrator;
mod scanner;

pub use ast_chunker::{Chunk, ChunkKind, ChunkerRegistry, Language};
pub use cache::{file_mtime, ChangeCache, FileChanges, CACHE_FILENAME};
pub use orchestrator::{
    resolve_root, IndexProgress, IndexReport, IndexStage, Indexer, IndexerOptions,
    ProgressCallback,
};
pub use scanner::{scan_files, ScanOptions};
