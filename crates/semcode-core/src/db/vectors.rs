//! Embedding encoding and brute-force similarity search

use super::schema::{SqliteStore, VectorRow};
use super::ScoredChunk;
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::sync::atomic::Ordering as AtomicOrdering;
use std::sync::Arc;

/// Convert f32 embedding to bytes for storage
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert bytes to f32 embedding
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

impl SqliteStore {
    /// All stored vectors, reloaded only after a write
    fn vector_snapshot(&self) -> Result<Arc<Vec<VectorRow>>> {
        let generation = self.inner.generation.load(AtomicOrdering::SeqCst);
        {
            let guard = self
                .inner
                .snapshot
                .read()
                .map_err(|_| Error::StoreQuery("vector snapshot lock poisoned".to_string()))?;
            if let Some((cached_gen, rows)) = guard.as_ref() {
                if *cached_gen == generation {
                    return Ok(rows.clone());
                }
            }
        }

        let rows = {
            let conn = self.inner.reader()?;
            let mut stmt = conn.prepare("SELECT id, embedding FROM chunks")?;
            let rows = stmt
                .query_map([], |row| {
                    let bytes: Vec<u8> = row.get(1)?;
                    Ok(VectorRow {
                        id: row.get(0)?,
                        vector: bytes_to_embedding(&bytes),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Arc::new(rows)
        };

        let mut guard = self
            .inner
            .snapshot
            .write()
            .map_err(|_| Error::StoreQuery("vector snapshot lock poisoned".to_string()))?;
        *guard = Some((generation, rows.clone()));
        tracing::debug!(vectors = rows.len(), generation, "reloaded vector snapshot");
        Ok(rows)
    }

    /// Top `k` chunks by cosine similarity, scores clamped to [0, 1]
    pub(crate) fn vector_query_sync(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let rows = self.vector_snapshot()?;

        let mut scored: Vec<(String, f32)> = rows
            .iter()
            .map(|row| {
                let sim = cosine_similarity(query, &row.vector);
                (row.id.clone(), sim.clamp(0.0, 1.0))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);

        let conn = self.inner.reader()?;
        self.fetch_scored(&conn, &scored)
    }
}
