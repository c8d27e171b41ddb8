//! Configuration management

use crate::error::{Result, SemcodeError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Environment variable prefix for every setting
pub const ENV_PREFIX: &str = "SEMCODE_";

/// Name of the per-project index directory when `local_index` is set
pub const LOCAL_INDEX_DIR: &str = ".semantic-code";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root of the global index cache (one subdirectory per project)
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Store the index inside the project tree instead of `cache_dir`
    #[serde(default)]
    pub local_index: bool,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub ranking: RankingConfig,

    /// Glob patterns (relative to the project root) excluded from indexing
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Files chunked concurrently during a pass
    #[serde(default = "default_chunk_parallelism")]
    pub chunk_parallelism: usize,

    /// Run an incremental pass before each search on an indexed project
    #[serde(default = "default_true")]
    pub refresh_on_search: bool,

    #[serde(default)]
    pub debug: bool,

    /// Log per-stage timings at info level
    #[serde(default)]
    pub profile: bool,
}

/// Which embedding backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local deterministic feature-hashing model
    Hash,
    /// OpenAI-compatible `/v1/embeddings` endpoint
    Http,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Http => "http",
        }
    }
}

impl std::str::FromStr for EmbeddingBackend {
    type Err = SemcodeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "http" => Ok(Self::Http),
            other => Err(SemcodeError::Config(format!(
                "unknown embedding backend '{}' (expected 'hash' or 'http')",
                other
            ))),
        }
    }
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_backend")]
    pub backend: EmbeddingBackend,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Base URL of the embeddings service (http backend only)
    #[serde(default)]
    pub url: Option<String>,

    /// Vector dimensionality; probed from the service when unset
    #[serde(default)]
    pub dimensions: Option<usize>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Texts sent per embedding call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            model: default_embedding_model(),
            url: None,
            dimensions: None,
            api_key: None,
            timeout_secs: default_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

/// Tuning constants of the hybrid ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Results scoring below this are dropped
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    /// Multiplicative boost when the whole query appears verbatim
    #[serde(default = "default_phrase_boost")]
    pub phrase_boost: f64,

    /// Maximum boost for partial overlap of significant query tokens
    #[serde(default = "default_partial_boost")]
    pub partial_boost: f64,

    /// Maximum recency boost, for a file modified right now
    #[serde(default = "default_recency_boost")]
    pub recency_boost: f64,

    /// Age at which the recency boost reaches zero
    #[serde(default = "default_recency_window")]
    pub recency_window_secs: f64,

    /// Base score factor for hits found only by keyword retrieval
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    /// Lowest score an exact phrase match can end with
    #[serde(default = "default_exact_match_floor")]
    pub exact_match_floor: f64,

    /// Content longer than this is truncated in results
    #[serde(default = "default_max_result_lines")]
    pub max_result_lines: usize,

    /// Each retrieval fetches `limit * overfetch_factor` candidates
    #[serde(default = "default_overfetch")]
    pub overfetch_factor: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            phrase_boost: default_phrase_boost(),
            partial_boost: default_partial_boost(),
            recency_boost: default_recency_boost(),
            recency_window_secs: default_recency_window(),
            keyword_weight: default_keyword_weight(),
            exact_match_floor: default_exact_match_floor(),
            max_result_lines: default_max_result_lines(),
            overfetch_factor: default_overfetch(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(crate::CACHE_DIR_NAME)
}

fn default_ignore_patterns() -> Vec<String> {
    [
        "node_modules/**",
        ".venv/**",
        "__pycache__/**",
        ".git/**",
        "*.pyc",
        ".pytest_cache/**",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_true() -> bool {
    true
}

fn default_chunk_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_backend() -> EmbeddingBackend {
    EmbeddingBackend::Hash
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_batch_size() -> usize {
    64
}

fn default_min_score() -> f64 {
    0.3
}

fn default_phrase_boost() -> f64 {
    0.4
}

fn default_partial_boost() -> f64 {
    0.15
}

fn default_recency_boost() -> f64 {
    0.05
}

fn default_recency_window() -> f64 {
    7.0 * 24.0 * 3600.0
}

fn default_keyword_weight() -> f64 {
    0.5
}

fn default_exact_match_floor() -> f64 {
    0.6
}

fn default_max_result_lines() -> usize {
    50
}

fn default_overfetch() -> usize {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            local_index: false,
            embedding: EmbeddingConfig::default(),
            ranking: RankingConfig::default(),
            ignore_patterns: default_ignore_patterns(),
            use_gitignore: true,
            chunk_parallelism: default_chunk_parallelism(),
            refresh_on_search: true,
            debug: false,
            profile: false,
        }
    }
}

impl Settings {
    /// Load settings from the config file (if any), then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var(format!("{}CONFIG", ENV_PREFIX))
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());

        let mut settings = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_yaml(&content)?
        } else {
            Self::default()
        };

        settings.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    /// Apply `KEY -> value` overrides; keys are setting names without the prefix
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(v) = lookup("LOCAL_INDEX") {
            self.local_index = parse_bool("LOCAL_INDEX", &v)?;
        }
        if let Some(url) = lookup("EMBEDDING_URL") {
            self.embedding.url = Some(url);
            self.embedding.backend = EmbeddingBackend::Http;
        }
        if let Some(backend) = lookup("EMBEDDING_BACKEND") {
            self.embedding.backend = backend.parse()?;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dims) = lookup("EMBEDDING_DIMS") {
            let dims = dims.trim().parse().map_err(|_| {
                SemcodeError::Config(format!("EMBEDDING_DIMS must be an integer, got '{}'", dims))
            })?;
            self.embedding.dimensions = Some(dims);
        }
        if let Some(key) = lookup("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(key);
        }
        if let Some(v) = lookup("DEBUG") {
            self.debug = parse_bool("DEBUG", &v)?;
        }
        if let Some(v) = lookup("PROFILE") {
            self.profile = parse_bool("PROFILE", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding.backend == EmbeddingBackend::Http && self.embedding.url.is_none() {
            return Err(SemcodeError::Config(
                "the http embedding backend requires an embedding url".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(SemcodeError::Config("embedding batch_size must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.ranking.min_score) {
            return Err(SemcodeError::Config(format!(
                "min_score must be within [0, 1], got {}",
                self.ranking.min_score
            )));
        }
        Ok(())
    }

    /// Directory holding the store and change cache for a project
    pub fn index_dir(&self, project: &Path) -> PathBuf {
        if self.local_index {
            return project.join(LOCAL_INDEX_DIR);
        }
        self.cache_dir.join(project_hash(project))
    }
}

/// First 16 hex chars of the sha256 of the project path
pub fn project_hash(project: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(SemcodeError::Config(format!(
            "{}{} must be a boolean, got '{}'",
            ENV_PREFIX, key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.local_index);
        assert!(settings.use_gitignore);
        assert_eq!(settings.embedding.backend, EmbeddingBackend::Hash);
        assert_eq!(settings.ranking.min_score, 0.3);
        assert_eq!(settings.ranking.max_result_lines, 50);
        assert!(settings.ignore_patterns.contains(&"node_modules/**".to_string()));
    }

    #[test]
    fn test_yaml_partial_config() {
        let yaml = "local_index: true\nranking:\n  phrase_boost: 0.3\n";
        let settings = Settings::from_yaml(yaml).unwrap();
        assert!(settings.local_index);
        assert_eq!(settings.ranking.phrase_boost, 0.3);
        assert_eq!(settings.ranking.recency_boost, 0.05);
        assert_eq!(settings.embedding.batch_size, 64);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(overrides(&[
                ("CACHE_DIR", "/tmp/semcode-cache"),
                ("LOCAL_INDEX", "true"),
                ("EMBEDDING_URL", "http://localhost:8080"),
                ("EMBEDDING_DIMS", "768"),
            ]))
            .unwrap();

        assert_eq!(settings.cache_dir, PathBuf::from("/tmp/semcode-cache"));
        assert!(settings.local_index);
        assert_eq!(settings.embedding.backend, EmbeddingBackend::Http);
        assert_eq!(settings.embedding.dimensions, Some(768));
        settings.validate().unwrap();
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(overrides(&[("LOCAL_INDEX", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, SemcodeError::Config(_)));
    }

    #[test]
    fn test_http_backend_requires_url() {
        let mut settings = Settings::default();
        settings.embedding.backend = EmbeddingBackend::Http;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_index_dir_global_and_local() {
        let mut settings = Settings {
            cache_dir: PathBuf::from("/cache"),
            ..Default::default()
        };
        let project = Path::new("/work/project");

        let global = settings.index_dir(project);
        assert_eq!(global.parent(), Some(Path::new("/cache")));
        assert_eq!(global.file_name().unwrap().len(), 16);
        assert_eq!(global, settings.index_dir(project));

        settings.local_index = true;
        assert_eq!(
            settings.index_dir(project),
            PathBuf::from("/work/project/.semantic-code")
        );
    }
}
