//! BM25 keyword search over chunk names and content via FTS5

use super::schema::SqliteStore;
use super::ScoredChunk;
use crate::error::Result;

/// OR-join of quoted terms, so punctuation in a term can't form FTS5 syntax
pub fn build_fts_query(terms: &[String]) -> Option<String> {
    let quoted: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();
    if quoted.is_empty() {
        None
    } else {
        Some(quoted.join(" OR "))
    }
}

/// Map a (negative, lower is better) bm25 rank into [0, 1)
fn normalize_rank(rank: f64) -> f32 {
    let x = (-rank).max(0.0);
    (x / (1.0 + x)) as f32
}

impl SqliteStore {
    pub(crate) fn keyword_query_sync(&self, terms: &[String], k: usize) -> Result<Vec<ScoredChunk>> {
        let fts_query = match build_fts_query(terms) {
            Some(q) if k > 0 => q,
            _ => return Ok(Vec::new()),
        };

        let conn = self.inner.reader()?;
        let mut stmt = conn.prepare_cached(
            "SELECT c.id, bm25(chunks_fts, 10.0, 1.0) AS rank
             FROM chunks_fts
             JOIN chunks c ON c.rowid = chunks_fts.rowid
             WHERE chunks_fts MATCH ?1
             ORDER BY rank, c.id
             LIMIT ?2",
        )?;
        let scored = stmt
            .query_map(rusqlite::params![fts_query, k as i64], |row| {
                let rank: f64 = row.get(1)?;
                Ok((row.get::<_, String>(0)?, normalize_rank(rank)))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        self.fetch_scored(&conn, &scored)
    }
}
