//! Async vector store interface and its SQLite implementation

use super::schema::SqliteStore;
use crate::error::{Error, Result};
use crate::index::ast_chunker::Chunk;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chunk with its embedding and the file mtime observed when it was read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
    pub mtime: f64,
}

/// A stored chunk returned by a query, with a score in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub id: String,
    pub chunk: Chunk,
    pub mtime: f64,
    pub score: f32,
}

/// Storage capability consumed by the indexer and the search engine
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite records by chunk identity
    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<usize>;

    /// Atomically replace every chunk of one file; returns (removed, added)
    async fn replace_file(&self, file_path: &str, records: Vec<EmbeddingRecord>)
        -> Result<(usize, usize)>;

    async fn delete_by_file(&self, file_path: &str) -> Result<usize>;

    async fn clear(&self) -> Result<usize>;

    async fn vector_query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    async fn keyword_query(&self, terms: &[String], k: usize) -> Result<Vec<ScoredChunk>>;

    async fn count(&self) -> Result<usize>;

    async fn indexed_files(&self) -> Result<Vec<String>>;

    /// Model name and dimensionality the stored vectors were built with
    async fn stored_model(&self) -> Result<Option<(String, usize)>> {
        Ok(None)
    }

    async fn record_model(&self, _model: &str, _dimensions: usize) -> Result<()> {
        Ok(())
    }
}

impl SqliteStore {
    /// Run a synchronous store call on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(SqliteStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(store))
            .await
            .map_err(|e| Error::StoreQuery(format!("store task failed: {}", e)))?
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<usize> {
        self.blocking(move |s| s.upsert_sync(&records)).await
    }

    async fn replace_file(
        &self,
        file_path: &str,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(usize, usize)> {
        let file_path = file_path.to_string();
        self.blocking(move |s| s.replace_file_sync(&file_path, &records))
            .await
    }

    async fn delete_by_file(&self, file_path: &str) -> Result<usize> {
        let file_path = file_path.to_string();
        self.blocking(move |s| s.delete_by_file_sync(&file_path)).await
    }

    async fn clear(&self) -> Result<usize> {
        self.blocking(|s| s.clear_sync()).await
    }

    async fn vector_query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let vector = vector.to_vec();
        self.blocking(move |s| s.vector_query_sync(&vector, k)).await
    }

    async fn keyword_query(&self, terms: &[String], k: usize) -> Result<Vec<ScoredChunk>> {
        let terms = terms.to_vec();
        self.blocking(move |s| s.keyword_query_sync(&terms, k)).await
    }

    async fn count(&self) -> Result<usize> {
        self.blocking(|s| s.count_sync()).await
    }

    async fn indexed_files(&self) -> Result<Vec<String>> {
        self.blocking(|s| s.indexed_files_sync()).await
    }

    async fn stored_model(&self) -> Result<Option<(String, usize)>> {
        self.blocking(|s| s.stored_model_sync()).await
    }

    async fn record_model(&self, model: &str, dimensions: usize) -> Result<()> {
        let model = model.to_string();
        self.blocking(move |s| s.record_model_sync(&model, dimensions))
            .await
    }
}
