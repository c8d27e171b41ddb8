//! Hybrid search: vector and keyword retrieval run concurrently, then ranked

use super::ranking::{merge_hits, rank};
use super::{query_terms, SearchOptions, SearchOutcome, SearchTimings};
use crate::config::RankingConfig;
use crate::db::VectorStore;
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::index::{Indexer, ProgressCallback};
use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Search engine for one project's index
pub struct HybridSearcher {
    indexer: Arc<Indexer>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    ranking: RankingConfig,
    refresh_on_search: bool,
}

impl HybridSearcher {
    pub fn new(
        indexer: Arc<Indexer>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        ranking: RankingConfig,
    ) -> Self {
        Self {
            indexer,
            embedder,
            store,
            ranking,
            refresh_on_search: true,
        }
    }

    /// Whether an already indexed project gets an incremental pass before each query
    pub fn with_refresh(mut self, refresh_on_search: bool) -> Self {
        self.refresh_on_search = refresh_on_search;
        self
    }

    /// Answer `query` against `project`, indexing it first when needed
    pub async fn search(
        &self,
        project: &Path,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchOutcome> {
        self.search_with_progress(project, query, options, None).await
    }

    /// Like [`search`](Self::search), reporting the indexing pass to `progress`
    pub async fn search_with_progress(
        &self,
        project: &Path,
        query: &str,
        options: &SearchOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query must not be empty".to_string()));
        }
        let total_start = Instant::now();

        let mut index_report = None;
        let mut indexing_ms = None;
        if !self.indexer.is_indexed() || self.refresh_on_search {
            let start = Instant::now();
            let report = self.indexer.index(project, false, progress).await?;
            indexing_ms = Some(start.elapsed().as_secs_f64() * 1000.0);
            if report.files_indexed > 0 || report.files_deleted > 0 {
                index_report = Some(report);
            }
        }

        if self.store.count().await? == 0 {
            return Err(Error::EmptyIndex(format!(
                "no indexable files under {}",
                project.display()
            )));
        }

        let start = Instant::now();
        let query_vector = self.embedder.embed(query).await?;
        let embedding_ms = start.elapsed().as_secs_f64() * 1000.0;

        let terms = query_terms(query);
        let k = options.limit.max(1) * self.ranking.overfetch_factor.max(1);

        let start = Instant::now();
        let (vector_hits, keyword_hits) = tokio::try_join!(
            self.store.vector_query(&query_vector, k),
            self.store.keyword_query(&terms, k),
        )?;
        let search_ms = start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            vector = vector_hits.len(),
            keyword = keyword_hits.len(),
            "retrieved candidates"
        );

        let start = Instant::now();
        let candidates = merge_hits(vector_hits, keyword_hits);
        let ranked = rank(
            candidates,
            query,
            &terms,
            &self.ranking,
            options,
            unix_now(),
        );
        let ranking_ms = start.elapsed().as_secs_f64() * 1000.0;

        let timings = SearchTimings {
            embedding_ms,
            search_ms,
            ranking_ms,
            total_ms: total_start.elapsed().as_secs_f64() * 1000.0,
            indexing_ms,
        };

        info!(
            results = ranked.results.len(),
            raw = ranked.raw_count,
            filtered = ranked.filtered_count,
            total_ms = timings.total_ms,
            "search completed"
        );

        Ok(SearchOutcome {
            results: ranked.results,
            raw_count: ranked.raw_count,
            filtered_count: ranked.filtered_count,
            index_report,
            timings,
        })
    }
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
