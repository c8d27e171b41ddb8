//! One-shot lazy initialization of the embedding backend

use super::{Embedder, HashEmbedder, HttpEmbedder, DEFAULT_DIMENSIONS};
use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Embedder whose backend is built on first use, exactly once per process.
///
/// Concurrent first callers wait on the same initialization. A failed
/// initialization surfaces as a model-load error and is retried by the next
/// caller.
pub struct LazyEmbedder {
    config: EmbeddingConfig,
    inner: OnceCell<Arc<dyn Embedder>>,
}

impl LazyEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            inner: OnceCell::new(),
        }
    }

    /// Wrap an already built backend
    pub fn from_embedder(embedder: Arc<dyn Embedder>, batch_size: usize) -> Self {
        Self {
            config: EmbeddingConfig {
                model: embedder.model_name().to_string(),
                dimensions: Some(embedder.dimensions()),
                batch_size: batch_size.max(1),
                ..Default::default()
            },
            inner: OnceCell::new_with(Some(embedder)),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.initialized()
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size.max(1)
    }

    /// The loaded backend, building it on first call
    pub async fn get(&self) -> Result<&Arc<dyn Embedder>> {
        self.inner
            .get_or_try_init(|| build_backend(&self.config))
            .await
    }
}

async fn build_backend(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.backend {
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::new(
            config.dimensions.unwrap_or(DEFAULT_DIMENSIONS),
        )),
        EmbeddingBackend::Http => {
            let http = HttpEmbedder::connect(config)
                .await
                .map_err(|e| Error::ModelLoad(format!("{}: {}", config.model, e)))?;
            Arc::new(http)
        }
    };

    info!(
        backend = config.backend.as_str(),
        model = embedder.model_name(),
        dimensions = embedder.dimensions(),
        "embedding model loaded"
    );
    Ok(embedder)
}

#[async_trait]
impl Embedder for LazyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.get().await?.embed(text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let embedder = self.get().await?;
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size()) {
            vectors.extend(embedder.embed_batch(batch).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        match self.inner.get() {
            Some(embedder) => embedder.dimensions(),
            None => self.config.dimensions.unwrap_or(0),
        }
    }

    fn model_name(&self) -> &str {
        match self.inner.get() {
            Some(embedder) => embedder.model_name(),
            None => &self.config.model,
        }
    }

    async fn warm_up(&self) -> Result<()> {
        self.get().await.map(|_| ())
    }
}
