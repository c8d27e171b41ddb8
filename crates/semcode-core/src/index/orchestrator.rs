//! Incremental indexing pass: scan, classify, chunk, embed, store, finalize

use super::ast_chunker::{Chunk, ChunkerRegistry};
use super::cache::{file_mtime, mtime_secs, ChangeCache};
use super::scanner::{scan_files, ScanOptions};
use crate::db::{EmbeddingRecord, VectorStore};
use crate::embedding::Embedder;
use crate::error::{Error, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Stage of an indexing pass, reported to progress callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStage {
    Scan,
    Classify,
    Chunk,
    Embed,
    Store,
    Finalize,
}

impl IndexStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scan => "scan",
            Self::Classify => "classify",
            Self::Chunk => "chunk",
            Self::Embed => "embed",
            Self::Store => "store",
            Self::Finalize => "finalize",
        }
    }
}

/// Indexing progress
#[derive(Debug, Clone)]
pub struct IndexProgress {
    pub stage: IndexStage,
    pub message: String,
    /// Overall completion, 0 to 100
    pub percent: f32,
}

pub type ProgressCallback = Box<dyn Fn(IndexProgress) + Send + Sync>;

/// Outcome of one indexing pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexReport {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub files_unchanged: usize,
    pub files_failed: usize,
    pub files_deleted: usize,
    pub chunks_added: usize,
    pub chunks_removed: usize,
    pub duration_ms: u64,
}

/// Indexer options
#[derive(Debug, Clone)]
pub struct IndexerOptions {
    pub ignore_patterns: Vec<String>,
    pub use_gitignore: bool,
    /// Files chunked concurrently
    pub chunk_parallelism: usize,
    /// Chunks per embedding request group
    pub embed_batch_size: usize,
    pub profile: bool,
}

impl Default for IndexerOptions {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            use_gitignore: true,
            chunk_parallelism: 4,
            embed_batch_size: 64,
            profile: false,
        }
    }
}

/// Result of reading and chunking one file
struct ChunkedFile {
    path: String,
    mtime: Option<u64>,
    outcome: Result<Vec<Chunk>>,
}

/// A chunked file waiting for its vectors
struct PendingFile {
    path: String,
    mtime: u64,
    chunks: Vec<Chunk>,
}

/// Runs indexing passes for one project against one index directory
pub struct Indexer {
    registry: Arc<ChunkerRegistry>,
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    index_dir: PathBuf,
    options: IndexerOptions,
    /// One pass at a time per index directory
    pass_lock: tokio::sync::Mutex<()>,
}

impl Indexer {
    pub fn new(
        registry: Arc<ChunkerRegistry>,
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        index_dir: impl Into<PathBuf>,
        options: IndexerOptions,
    ) -> Self {
        Self {
            registry,
            embedder,
            store,
            index_dir: index_dir.into(),
            options,
            pass_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Whether a pass has completed for this index directory
    pub fn is_indexed(&self) -> bool {
        ChangeCache::exists(&self.index_dir)
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Bring the store in line with the files under `project`.
    ///
    /// The change cache is only written after every store write succeeded, so
    /// an interrupted or failed pass is redone from the same starting point.
    /// A rebuild discards the cache before clearing the store, so a rebuild
    /// that fails part way leaves every file to be indexed again.
    pub async fn index(
        &self,
        project: &Path,
        force: bool,
        progress: Option<ProgressCallback>,
    ) -> Result<IndexReport> {
        let started = Instant::now();
        let notify = |stage: IndexStage, percent: f32, message: String| {
            if let Some(ref cb) = progress {
                cb(IndexProgress {
                    stage,
                    message,
                    percent,
                });
            }
        };

        let root = resolve_root(project)?;
        let _pass = self.pass_lock.lock().await;

        notify(IndexStage::Scan, 0.0, format!("Scanning {}", root.display()));
        let stage_start = Instant::now();
        let current = self.scan(&root).await?;
        self.profile("scan", stage_start);

        notify(
            IndexStage::Classify,
            10.0,
            format!("Found {} files", current.len()),
        );
        self.embedder.warm_up().await?;
        let rebuild = force || self.model_changed().await?;

        let mut cache = ChangeCache::load(&self.index_dir);
        let mut chunks_removed = 0;
        if rebuild {
            ChangeCache::discard(&self.index_dir)?;
            chunks_removed += self.store.clear().await?;
            cache.replace(BTreeMap::new());
        }
        let changes = cache.classify(&current);

        let discovered: BTreeSet<&str> = current.iter().map(|(f, _)| f.as_str()).collect();
        let mut deleted: BTreeSet<String> = changes.deleted.iter().cloned().collect();
        for file in self.store.indexed_files().await? {
            if !discovered.contains(file.as_str()) {
                deleted.insert(file);
            }
        }

        debug!(
            new = changes.new.len(),
            modified = changes.modified.len(),
            deleted = deleted.len(),
            unchanged = changes.unchanged.len(),
            "classified files"
        );

        let to_process: Vec<String> = changes.to_process().cloned().collect();
        notify(
            IndexStage::Chunk,
            20.0,
            format!("Chunking {} files", to_process.len()),
        );
        let stage_start = Instant::now();
        let chunked = self.chunk_files(to_process).await;
        self.profile("chunk", stage_start);

        let mut next_cache: BTreeMap<String, u64> = BTreeMap::new();
        for file in &changes.unchanged {
            if let Some(mtime) = cache.mtime(file) {
                next_cache.insert(file.clone(), mtime);
            }
        }

        let mut files_failed = 0;
        let mut unreadable: Vec<String> = Vec::new();
        let mut pending: Vec<PendingFile> = Vec::new();
        for file in chunked {
            match (file.outcome, file.mtime) {
                (Ok(chunks), Some(mtime)) => pending.push(PendingFile {
                    path: file.path,
                    mtime,
                    chunks,
                }),
                (Err(e), mtime) => {
                    warn!(path = %file.path, error = %e, "skipping file");
                    files_failed += 1;
                    if let (true, Some(mtime)) = (e.is_file_level(), mtime) {
                        next_cache.insert(file.path.clone(), mtime);
                    }
                    unreadable.push(file.path);
                }
                (Ok(_), None) => files_failed += 1,
            }
        }

        let total_chunks: usize = pending.iter().map(|f| f.chunks.len()).sum();
        notify(
            IndexStage::Embed,
            40.0,
            format!("Embedding {} chunks", total_chunks),
        );
        let stage_start = Instant::now();
        let (embedded, embed_failures) = self.embed_files(pending).await?;
        self.profile("embed", stage_start);

        files_failed += embed_failures.len();
        for path in embed_failures {
            if let Some(mtime) = cache.mtime(&path) {
                next_cache.insert(path, mtime);
            }
        }

        notify(
            IndexStage::Store,
            80.0,
            format!("Writing {} files", embedded.len()),
        );
        let stage_start = Instant::now();
        for file in &deleted {
            chunks_removed += self.store.delete_by_file(file).await?;
        }
        for file in &unreadable {
            chunks_removed += self.store.delete_by_file(file).await?;
        }

        let mut chunks_added = 0;
        let files_indexed = embedded.len();
        for (path, mtime, records) in embedded {
            let (removed, added) = self.store.replace_file(&path, records).await?;
            chunks_removed += removed;
            chunks_added += added;
            next_cache.insert(path, mtime);
        }
        self.profile("store", stage_start);

        notify(IndexStage::Finalize, 95.0, "Saving change cache".to_string());
        self.store
            .record_model(self.embedder.model_name(), self.embedder.dimensions())
            .await?;
        cache.replace(next_cache);
        cache.save()?;

        let report = IndexReport {
            files_scanned: current.len(),
            files_indexed,
            files_unchanged: changes.unchanged.len(),
            files_failed,
            files_deleted: deleted.len(),
            chunks_added,
            chunks_removed,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            project = %root.display(),
            indexed = report.files_indexed,
            unchanged = report.files_unchanged,
            failed = report.files_failed,
            deleted = report.files_deleted,
            chunks_added = report.chunks_added,
            chunks_removed = report.chunks_removed,
            duration_ms = report.duration_ms,
            "indexing completed"
        );
        notify(IndexStage::Finalize, 100.0, "Done".to_string());

        Ok(report)
    }

    /// New or modified files under `project` that the last pass has not seen
    pub async fn stale_files(&self, project: &Path) -> Result<Vec<String>> {
        let root = resolve_root(project)?;
        let current = self.scan(&root).await?;
        let changes = ChangeCache::load(&self.index_dir).classify(&current);
        Ok(changes.to_process().cloned().collect())
    }

    /// Discover files and their current mtimes
    async fn scan(&self, root: &Path) -> Result<Vec<(String, u64)>> {
        let options = ScanOptions {
            extensions: self.registry.supported_extensions(),
            ignore_patterns: self.options.ignore_patterns.clone(),
            use_gitignore: self.options.use_gitignore,
            exclude_hidden: true,
        };
        let root = root.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let files = scan_files(&root, &options)?;
            Ok(files
                .into_iter()
                .filter_map(|path| match file_mtime(&path) {
                    Ok(mtime) => Some((path.to_string_lossy().into_owned(), mtime)),
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "file vanished during scan");
                        None
                    }
                })
                .collect())
        })
        .await
        .map_err(|e| Error::Other(anyhow::anyhow!("scan task failed: {}", e)))?
    }

    /// Whether the store was built with a different model than the current one
    async fn model_changed(&self) -> Result<bool> {
        let current = (
            self.embedder.model_name().to_string(),
            self.embedder.dimensions(),
        );
        match self.store.stored_model().await? {
            Some(stored) if stored != current => {
                warn!(
                    stored_model = %stored.0,
                    stored_dimensions = stored.1,
                    model = %current.0,
                    dimensions = current.1,
                    "embedding model changed, rebuilding index"
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn chunk_files(&self, files: Vec<String>) -> Vec<ChunkedFile> {
        let parallelism = self.options.chunk_parallelism.max(1);

        let mut chunked: Vec<ChunkedFile> = stream::iter(files)
            .map(|path| {
                let registry = self.registry.clone();
                async move {
                    let task_path = path.clone();
                    tokio::task::spawn_blocking(move || chunk_file(&registry, task_path))
                        .await
                        .unwrap_or_else(|e| ChunkedFile {
                            path,
                            mtime: None,
                            outcome: Err(Error::Other(anyhow::anyhow!(
                                "chunking task failed: {}",
                                e
                            ))),
                        })
                }
            })
            .buffer_unordered(parallelism)
            .collect()
            .await;

        chunked.sort_by(|a, b| a.path.cmp(&b.path));
        chunked
    }

    /// Embed every pending file; returns embedded files and the paths that failed.
    ///
    /// Files are grouped so each group holds about one batch of chunks. A failed
    /// group is retried file by file so one bad file does not sink its
    /// neighbours. A model load failure aborts the pass.
    async fn embed_files(
        &self,
        pending: Vec<PendingFile>,
    ) -> Result<(Vec<(String, u64, Vec<EmbeddingRecord>)>, Vec<String>)> {
        let batch_size = self.options.embed_batch_size.max(1);
        let mut embedded = Vec::with_capacity(pending.len());
        let mut failed = Vec::new();

        let mut group: Vec<PendingFile> = Vec::new();
        let mut group_chunks = 0;
        let mut groups: Vec<Vec<PendingFile>> = Vec::new();
        for file in pending {
            group_chunks += file.chunks.len();
            group.push(file);
            if group_chunks >= batch_size {
                groups.push(std::mem::take(&mut group));
                group_chunks = 0;
            }
        }
        if !group.is_empty() {
            groups.push(group);
        }

        for group in groups {
            let texts: Vec<String> = group
                .iter()
                .flat_map(|f| f.chunks.iter().map(|c| c.content.clone()))
                .collect();

            match self.embed_texts(&texts).await {
                Ok(vectors) => {
                    let mut vectors = vectors.into_iter();
                    for file in group {
                        let records = attach_vectors(&file, vectors.by_ref());
                        embedded.push((file.path, file.mtime, records));
                    }
                }
                Err(e @ Error::ModelLoad(_)) => return Err(e),
                Err(e) => {
                    warn!(error = %e, files = group.len(), "embedding batch failed, retrying per file");
                    for file in group {
                        let texts: Vec<String> =
                            file.chunks.iter().map(|c| c.content.clone()).collect();
                        match self.embed_texts(&texts).await {
                            Ok(vectors) => {
                                let records = attach_vectors(&file, vectors.into_iter());
                                embedded.push((file.path, file.mtime, records));
                            }
                            Err(e @ Error::ModelLoad(_)) => return Err(e),
                            Err(e) => {
                                warn!(path = %file.path, error = %e, "embedding failed, file skipped");
                                failed.push(file.path);
                            }
                        }
                    }
                }
            }
        }

        Ok((embedded, failed))
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.embedder.embed_batch(texts).await?;
        if vectors.len() != texts.len() {
            return Err(Error::ExternalError(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }

    fn profile(&self, stage: &str, started: Instant) {
        if self.options.profile {
            info!(
                stage,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "index stage timing"
            );
        }
    }
}

fn attach_vectors(
    file: &PendingFile,
    vectors: impl Iterator<Item = Vec<f32>>,
) -> Vec<EmbeddingRecord> {
    file.chunks
        .iter()
        .cloned()
        .zip(vectors)
        .map(|(chunk, vector)| EmbeddingRecord {
            chunk,
            vector,
            mtime: mtime_secs(file.mtime),
        })
        .collect()
}

/// Read one file and run its chunker; mtime is taken before the read
fn chunk_file(registry: &ChunkerRegistry, path: String) -> ChunkedFile {
    let fs_path = PathBuf::from(&path);
    let mtime = match file_mtime(&fs_path) {
        Ok(mtime) => mtime,
        Err(e) => {
            return ChunkedFile {
                path,
                mtime: None,
                outcome: Err(e),
            }
        }
    };

    let outcome = std::fs::read(&fs_path)
        .map_err(Error::from)
        .and_then(|bytes| {
            String::from_utf8(bytes).map_err(|e| Error::decode(path.clone(), e.to_string()))
        })
        .and_then(|source| {
            registry
                .chunk_file(&fs_path, &source)
                .map(|chunks| chunks.unwrap_or_default())
        });

    ChunkedFile {
        path,
        mtime: Some(mtime),
        outcome,
    }
}

/// Absolute form of `project`, which must be an existing directory
pub fn resolve_root(project: &Path) -> Result<PathBuf> {
    let root = project.canonicalize().map_err(|e| {
        Error::InvalidInput(format!("project path {}: {}", project.display(), e))
    })?;
    if !root.is_dir() {
        return Err(Error::InvalidInput(format!(
            "project path {} is not a directory",
            root.display()
        )));
    }
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ScoredChunk, SqliteStore};
    use crate::embedding::HashEmbedder;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// SQLite store whose file writes can be switched to fail
    struct FlakyStore {
        inner: SqliteStore,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl VectorStore for FlakyStore {
        async fn upsert(&self, records: Vec<EmbeddingRecord>) -> Result<usize> {
            self.inner.upsert(records).await
        }

        async fn replace_file(
            &self,
            file_path: &str,
            records: Vec<EmbeddingRecord>,
        ) -> Result<(usize, usize)> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(Error::StoreWrite("disk full".to_string()));
            }
            self.inner.replace_file(file_path, records).await
        }

        async fn delete_by_file(&self, file_path: &str) -> Result<usize> {
            self.inner.delete_by_file(file_path).await
        }

        async fn clear(&self) -> Result<usize> {
            self.inner.clear().await
        }

        async fn vector_query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
            self.inner.vector_query(vector, k).await
        }

        async fn keyword_query(&self, terms: &[String], k: usize) -> Result<Vec<ScoredChunk>> {
            self.inner.keyword_query(terms, k).await
        }

        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }

        async fn indexed_files(&self) -> Result<Vec<String>> {
            self.inner.indexed_files().await
        }

        async fn stored_model(&self) -> Result<Option<(String, usize)>> {
            self.inner.stored_model().await
        }

        async fn record_model(&self, model: &str, dimensions: usize) -> Result<()> {
            self.inner.record_model(model, dimensions).await
        }
    }

    fn indexer(index_dir: &Path) -> (Indexer, SqliteStore) {
        let store = SqliteStore::open(index_dir).unwrap();
        let indexer = Indexer::new(
            Arc::new(ChunkerRegistry::with_defaults().unwrap()),
            Arc::new(HashEmbedder::new(64)),
            Arc::new(store.clone()),
            index_dir,
            IndexerOptions::default(),
        );
        (indexer, store)
    }

    #[tokio::test]
    async fn test_rejects_missing_project() {
        let idx = TempDir::new().unwrap();
        let (indexer, _) = indexer(idx.path());
        let err = indexer
            .index(Path::new("/definitely/not/here"), false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_undecodable_file_is_counted_and_skipped() {
        let project = TempDir::new().unwrap();
        let idx = TempDir::new().unwrap();
        std::fs::write(project.path().join("ok.py"), "def ok():\n    return 1\n").unwrap();
        std::fs::write(project.path().join("bad.py"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let (indexer, store) = indexer(idx.path());
        let report = indexer.index(project.path(), false, None).await.unwrap();
        assert_eq!(report.files_scanned, 2);
        assert_eq!(report.files_indexed, 1);
        assert_eq!(report.files_failed, 1);
        assert_eq!(store.count().await.unwrap(), 1);

        // recorded in the cache, so an unchanged bad file is not retried
        let again = indexer.index(project.path(), false, None).await.unwrap();
        assert_eq!(again.files_unchanged, 2);
        assert_eq!(again.files_failed, 0);
    }

    #[tokio::test]
    async fn test_progress_reaches_every_stage() {
        let project = TempDir::new().unwrap();
        let idx = TempDir::new().unwrap();
        std::fs::write(project.path().join("a.md"), "# Title\n\nBody\n").unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (indexer, _) = indexer(idx.path());
        indexer
            .index(
                project.path(),
                false,
                Some(Box::new(move |p: IndexProgress| {
                    sink.lock().unwrap().push(p.stage)
                })),
            )
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        for stage in [
            IndexStage::Scan,
            IndexStage::Classify,
            IndexStage::Chunk,
            IndexStage::Embed,
            IndexStage::Store,
            IndexStage::Finalize,
        ] {
            assert!(seen.contains(&stage), "missing {}", stage.as_str());
        }
    }

    #[tokio::test]
    async fn test_force_rebuilds_everything() {
        let project = TempDir::new().unwrap();
        let idx = TempDir::new().unwrap();
        std::fs::write(project.path().join("a.py"), "def a():\n    pass\n").unwrap();

        let (indexer, store) = indexer(idx.path());
        indexer.index(project.path(), false, None).await.unwrap();
        let report = indexer.index(project.path(), true, None).await.unwrap();
        assert_eq!(report.files_indexed, 1);
        assert_eq!(report.files_unchanged, 0);
        assert_eq!(report.chunks_removed, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_model_change_triggers_rebuild() {
        let project = TempDir::new().unwrap();
        let idx = TempDir::new().unwrap();
        std::fs::write(project.path().join("a.py"), "def a():\n    pass\n").unwrap();

        let (indexer, store) = indexer(idx.path());
        indexer.index(project.path(), false, None).await.unwrap();

        let wider = Indexer::new(
            Arc::new(ChunkerRegistry::with_defaults().unwrap()),
            Arc::new(HashEmbedder::new(128)),
            Arc::new(store.clone()),
            idx.path(),
            IndexerOptions::default(),
        );
        let report = wider.index(project.path(), false, None).await.unwrap();
        assert_eq!(report.files_indexed, 1);
        assert_eq!(
            store.stored_model().await.unwrap(),
            Some(("feature-hash-128".to_string(), 128))
        );
    }

    #[tokio::test]
    async fn test_failed_rebuild_is_redone_on_next_pass() {
        let project = TempDir::new().unwrap();
        let idx = TempDir::new().unwrap();
        std::fs::write(project.path().join("a.py"), "def a():\n    pass\n").unwrap();
        std::fs::write(project.path().join("b.rs"), "fn b() {}\n").unwrap();
        std::fs::write(project.path().join("c.md"), "# C\n\nText\n").unwrap();

        let store = Arc::new(FlakyStore {
            inner: SqliteStore::open(idx.path()).unwrap(),
            fail_writes: AtomicBool::new(false),
        });
        let indexer = Indexer::new(
            Arc::new(ChunkerRegistry::with_defaults().unwrap()),
            Arc::new(HashEmbedder::new(64)),
            store.clone(),
            idx.path(),
            IndexerOptions::default(),
        );

        indexer.index(project.path(), false, None).await.unwrap();
        let before = store.count().await.unwrap();
        assert!(before >= 3);

        store.fail_writes.store(true, Ordering::SeqCst);
        let err = indexer.index(project.path(), true, None).await.unwrap_err();
        assert!(matches!(err, Error::StoreWrite(_)));
        assert!(!indexer.is_indexed());

        store.fail_writes.store(false, Ordering::SeqCst);
        let retry = indexer.index(project.path(), false, None).await.unwrap();
        assert_eq!(retry.files_indexed, 3);
        assert_eq!(retry.files_unchanged, 0);
        assert_eq!(store.count().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_second_pass_sees_no_changes() {
        let project = TempDir::new().unwrap();
        let idx = TempDir::new().unwrap();
        std::fs::write(project.path().join("a.py"), "def a():\n    pass\n").unwrap();
        std::fs::write(project.path().join("b.rs"), "fn b() {}\n").unwrap();

        let (indexer, _) = indexer(idx.path());
        indexer.index(project.path(), false, None).await.unwrap();

        assert!(indexer.stale_files(project.path()).await.unwrap().is_empty());
        let again = indexer.index(project.path(), false, None).await.unwrap();
        assert_eq!(again.files_indexed, 0);
        assert_eq!(again.files_unchanged, 2);
    }
}
