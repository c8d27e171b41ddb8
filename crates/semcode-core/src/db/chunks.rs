//! Chunk row storage operations

use super::schema::SqliteStore;
use super::vectors::embedding_to_bytes;
use super::EmbeddingRecord;
use super::ScoredChunk;
use crate::error::{Error, Result};
use crate::index::ast_chunker::{Chunk, ChunkKind};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;

const CHUNK_COLUMNS: &str =
    "id, file_path, kind, name, content, line_start, line_end, language, mtime";

/// Delete-then-insert so the FTS delete trigger fires for replaced rows
fn insert_records(conn: &Connection, records: &[EmbeddingRecord], now: &str) -> rusqlite::Result<usize> {
    let mut delete = conn.prepare_cached("DELETE FROM chunks WHERE id = ?1")?;
    let mut insert = conn.prepare_cached(
        "INSERT INTO chunks
            (id, file_path, kind, name, content, line_start, line_end, language, seq, mtime, embedding, indexed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )?;

    for (seq, record) in records.iter().enumerate() {
        let chunk = &record.chunk;
        let id = chunk.id();
        delete.execute([&id])?;
        insert.execute(params![
            id,
            chunk.file_path,
            chunk.kind.as_str(),
            chunk.name,
            chunk.content,
            chunk.line_start as i64,
            chunk.line_end as i64,
            chunk.language,
            seq as i64,
            record.mtime,
            embedding_to_bytes(&record.vector),
            now,
        ])?;
    }
    Ok(records.len())
}

fn row_to_chunk(row: &Row<'_>) -> rusqlite::Result<(String, Chunk, f64)> {
    let kind: String = row.get(2)?;
    let kind = ChunkKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown chunk kind '{}'", kind).into(),
        )
    })?;
    Ok((
        row.get(0)?,
        Chunk {
            file_path: row.get(1)?,
            kind,
            name: row.get(3)?,
            content: row.get(4)?,
            line_start: row.get::<_, i64>(5)? as usize,
            line_end: row.get::<_, i64>(6)? as usize,
            language: row.get(7)?,
        },
        row.get(8)?,
    ))
}

impl SqliteStore {
    pub(crate) fn upsert_sync(&self, records: &[EmbeddingRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let now = chrono::Utc::now().to_rfc3339();
        self.inner.write_txn(|conn| insert_records(conn, records, &now))
    }

    /// Swap every chunk of `file_path` for `records` in one transaction
    pub(crate) fn replace_file_sync(
        &self,
        file_path: &str,
        records: &[EmbeddingRecord],
    ) -> Result<(usize, usize)> {
        if let Some(stray) = records.iter().find(|r| r.chunk.file_path != file_path) {
            return Err(Error::StoreWrite(format!(
                "record for {} passed while replacing {}",
                stray.chunk.file_path, file_path
            )));
        }
        let now = chrono::Utc::now().to_rfc3339();
        self.inner.write_txn(|conn| {
            let removed = conn.execute("DELETE FROM chunks WHERE file_path = ?1", [file_path])?;
            let added = insert_records(conn, records, &now)?;
            Ok((removed, added))
        })
    }

    pub(crate) fn delete_by_file_sync(&self, file_path: &str) -> Result<usize> {
        self.inner
            .write_txn(|conn| conn.execute("DELETE FROM chunks WHERE file_path = ?1", [file_path]))
    }

    pub(crate) fn clear_sync(&self) -> Result<usize> {
        self.inner.write_txn(|conn| {
            let removed = conn.execute("DELETE FROM chunks", [])?;
            conn.execute("DELETE FROM store_meta", [])?;
            Ok(removed)
        })
    }

    pub(crate) fn count_sync(&self) -> Result<usize> {
        let conn = self.inner.reader()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub(crate) fn indexed_files_sync(&self) -> Result<Vec<String>> {
        let conn = self.inner.reader()?;
        let mut stmt = conn.prepare("SELECT DISTINCT file_path FROM chunks ORDER BY file_path")?;
        let files = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(files)
    }

    /// Chunks of one file in the order they were produced
    pub fn chunks_for_file(&self, file_path: &str) -> Result<Vec<Chunk>> {
        let conn = self.inner.reader()?;
        let sql = format!(
            "SELECT {} FROM chunks WHERE file_path = ?1 ORDER BY seq",
            CHUNK_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let chunks = stmt
            .query_map([file_path], row_to_chunk)?
            .map(|r| r.map(|(_, chunk, _)| chunk))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(chunks)
    }

    /// Load rows for `scores`, keeping the caller's scores
    pub(crate) fn fetch_scored(
        &self,
        conn: &Connection,
        scores: &[(String, f32)],
    ) -> Result<Vec<ScoredChunk>> {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM chunks WHERE id = ?1",
            CHUNK_COLUMNS
        ))?;
        let mut results = Vec::with_capacity(scores.len());
        for (id, score) in scores {
            if let Some((id, chunk, mtime)) = stmt.query_row([id], row_to_chunk).optional()? {
                results.push(ScoredChunk {
                    id,
                    chunk,
                    mtime,
                    score: *score,
                });
            }
        }
        Ok(results)
    }

    pub(crate) fn stored_model_sync(&self) -> Result<Option<(String, usize)>> {
        let conn = self.inner.reader()?;
        let mut stmt = conn.prepare("SELECT key, value FROM store_meta")?;
        let meta: HashMap<String, String> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;

        match (meta.get("model"), meta.get("dimensions")) {
            (Some(model), Some(dims)) => {
                let dims = dims
                    .parse()
                    .map_err(|_| Error::StoreQuery(format!("bad stored dimensions: {}", dims)))?;
                Ok(Some((model.clone(), dims)))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn record_model_sync(&self, model: &str, dimensions: usize) -> Result<()> {
        self.inner.write_txn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO store_meta (key, value) VALUES ('model', ?1)",
                [model],
            )?;
            conn.execute(
                "INSERT OR REPLACE INTO store_meta (key, value) VALUES ('dimensions', ?1)",
                [dimensions.to_string()],
            )?;
            Ok(())
        })
    }
}
