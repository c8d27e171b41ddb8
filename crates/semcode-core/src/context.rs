//! Process-wide application context

use crate::config::Settings;
use crate::db::{SqliteStore, VectorStore};
use crate::embedding::{Embedder, LazyEmbedder};
use crate::error::{Error, Result};
use crate::index::{
    resolve_root, ChangeCache, ChunkerRegistry, IndexReport, Indexer, IndexerOptions,
    ProgressCallback, CACHE_FILENAME,
};
use crate::search::{HybridSearcher, SearchOptions, SearchOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Live view of one project's index
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub is_indexed: bool,
    pub files_count: usize,
    pub chunks_count: usize,
    /// When the change cache was last written
    pub last_updated: Option<String>,
    /// Files changed or added since the last pass
    pub stale_files: Vec<String>,
}

/// Opened store and indexer for one index directory
struct ProjectIndex {
    store: SqliteStore,
    indexer: Arc<Indexer>,
}

/// Everything a process needs to index and search projects.
///
/// Built once at startup; owns the chunker registry, the shared embedding
/// model, and one opened store per index directory.
pub struct AppContext {
    settings: Settings,
    registry: Arc<ChunkerRegistry>,
    embedder: Arc<LazyEmbedder>,
    projects: Mutex<HashMap<PathBuf, Arc<ProjectIndex>>>,
}

impl AppContext {
    pub fn new(settings: Settings) -> Result<Self> {
        let embedder = Arc::new(LazyEmbedder::new(settings.embedding.clone()));
        Self::build(settings, embedder)
    }

    /// Context around an already built embedding backend
    pub fn with_embedder(settings: Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let batch_size = settings.embedding.batch_size;
        Self::build(
            settings,
            Arc::new(LazyEmbedder::from_embedder(embedder, batch_size)),
        )
    }

    fn build(settings: Settings, embedder: Arc<LazyEmbedder>) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            registry: Arc::new(ChunkerRegistry::with_defaults()?),
            embedder,
            projects: Mutex::new(HashMap::new()),
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ChunkerRegistry {
        &self.registry
    }

    /// Whether the embedding model has been built yet
    pub fn embedder_loaded(&self) -> bool {
        self.embedder.is_loaded()
    }

    /// Index directory a project maps to
    pub fn index_dir_for(&self, project: &Path) -> Result<PathBuf> {
        Ok(self.settings.index_dir(&resolve_root(project)?))
    }

    fn project(&self, project: &Path) -> Result<(PathBuf, Arc<ProjectIndex>)> {
        let root = resolve_root(project)?;
        let index_dir = self.settings.index_dir(&root);

        let mut projects = self
            .projects
            .lock()
            .map_err(|_| Error::Other(anyhow::anyhow!("project cache lock poisoned")))?;
        if let Some(existing) = projects.get(&index_dir) {
            return Ok((root, existing.clone()));
        }

        let store = SqliteStore::open(&index_dir)?;
        let options = IndexerOptions {
            ignore_patterns: self.settings.ignore_patterns.clone(),
            use_gitignore: self.settings.use_gitignore,
            chunk_parallelism: self.settings.chunk_parallelism,
            embed_batch_size: self.settings.embedding.batch_size,
            profile: self.settings.profile,
        };
        let indexer = Arc::new(Indexer::new(
            self.registry.clone(),
            self.embedder.clone(),
            Arc::new(store.clone()),
            index_dir.clone(),
            options,
        ));
        let entry = Arc::new(ProjectIndex { store, indexer });
        projects.insert(index_dir, entry.clone());
        Ok((root, entry))
    }

    pub async fn index_codebase(
        &self,
        project: &Path,
        force: bool,
        progress: Option<ProgressCallback>,
    ) -> Result<IndexReport> {
        let (root, entry) = self.project(project)?;
        entry.indexer.index(&root, force, progress).await
    }

    pub async fn search_code(
        &self,
        project: &Path,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchOutcome> {
        self.search_code_with_progress(project, query, options, None)
            .await
    }

    pub async fn search_code_with_progress(
        &self,
        project: &Path,
        query: &str,
        options: &SearchOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<SearchOutcome> {
        let (root, entry) = self.project(project)?;
        let searcher = HybridSearcher::new(
            entry.indexer.clone(),
            self.embedder.clone(),
            Arc::new(entry.store.clone()),
            self.settings.ranking.clone(),
        )
        .with_refresh(self.settings.refresh_on_search);
        searcher
            .search_with_progress(&root, query, options, progress)
            .await
    }

    pub async fn index_status(&self, project: &Path) -> Result<IndexStatus> {
        let (root, entry) = self.project(project)?;
        let index_dir = entry.indexer.index_dir();
        let is_indexed = ChangeCache::exists(index_dir);

        let last_updated = std::fs::metadata(index_dir.join(CACHE_FILENAME))
            .and_then(|m| m.modified())
            .ok()
            .map(|t| DateTime::<Utc>::from(t).to_rfc3339());

        let stale_files = entry.indexer.stale_files(&root).await?;

        Ok(IndexStatus {
            is_indexed,
            files_count: entry.store.indexed_files().await?.len(),
            chunks_count: entry.store.count().await?,
            last_updated,
            stale_files,
        })
    }
}
