//! HTTP embedder for OpenAI-compatible services (vLLM, TEI, OpenAI, ...)

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROBE_TEXT: &str = "dimension probe";

pub struct HttpEmbedder {
    http_client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Build the client; probes the service once when dimensions are not configured
    pub async fn connect(config: &EmbeddingConfig) -> Result<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| Error::Config("embedding url is not set".to_string()))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let mut embedder = Self {
            http_client,
            url: url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimensions: config.dimensions.unwrap_or(0),
        };

        if embedder.dimensions == 0 {
            let probe = embedder.request(&[PROBE_TEXT.to_string()]).await?;
            embedder.dimensions = probe.first().map(|v| v.len()).unwrap_or(0);
            if embedder.dimensions == 0 {
                return Err(Error::ExternalError(
                    "embedding service returned an empty vector".to_string(),
                ));
            }
            tracing::info!(
                model = %embedder.model,
                dimensions = embedder.dimensions,
                "probed embedding dimensions"
            );
        }

        Ok(embedder)
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let endpoint = format!("{}/v1/embeddings", self.url);
        let mut req = self.http_client.post(&endpoint).json(&EmbedRequest {
            model: &self.model,
            input: texts,
        });

        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ExternalError(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let mut parsed: EmbedResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(Error::ExternalError(format!(
                "embedding service returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }
        if parsed.data.iter().all(|d| d.index.is_some()) {
            parsed.data.sort_by_key(|d| d.index);
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| Error::ExternalError("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = self.request(texts).await?;
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(Error::ExternalError(format!(
                "expected {}-dimensional embeddings, got {}",
                self.dimensions,
                bad.len()
            )));
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_requires_url() {
        let config = EmbeddingConfig::default();
        let err = HttpEmbedder::connect(&config).await.err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_probe() {
        let config = EmbeddingConfig {
            url: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 2,
            ..Default::default()
        };
        assert!(HttpEmbedder::connect(&config).await.is_err());
    }

    #[test]
    fn test_response_shape() {
        let body = r#"{"data":[{"index":1,"embedding":[0.5]},{"index":0,"embedding":[0.25]}]}"#;
        let mut parsed: EmbedResponse = serde_json::from_str(body).unwrap();
        parsed.data.sort_by_key(|d| d.index);
        assert_eq!(parsed.data[0].embedding, vec![0.25]);
    }
}
