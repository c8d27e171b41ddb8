//! Chunk store: SQLite rows, FTS5 keyword index and embedding vectors

mod chunks;
mod fts;
mod schema;
mod store;
mod vectors;

pub use fts::build_fts_query;
pub use schema::{SqliteStore, STORE_FILENAME};
pub use store::{EmbeddingRecord, ScoredChunk, VectorStore};
pub use vectors::{bytes_to_embedding, cosine_similarity, embedding_to_bytes};
