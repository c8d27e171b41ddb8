//! Error types for semcode

use thiserror::Error;

/// Result type alias using SemcodeError
pub type Result<T> = std::result::Result<T, SemcodeError>;

/// Error type alias for convenience
pub type Error = SemcodeError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const EMPTY_INDEX: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const MODEL_UNAVAILABLE: i32 = 4;
}

/// Main error type for semcode
#[derive(Debug, Error)]
pub enum SemcodeError {
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Cannot decode {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Store write failed: {0}")]
    StoreWrite(String),

    #[error("Store query failed: {0}")]
    StoreQuery(String),

    #[error("Embedding model unavailable: {0}")]
    ModelLoad(String),

    #[error("Configuration conflict: {0}")]
    ConfigurationConflict(String),

    #[error("Nothing to search yet: {0}")]
    EmptyIndex(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SemcodeError {
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// File-level failures are logged and skipped, never abort a pass
    pub fn is_file_level(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Decode { .. })
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::EmptyIndex(_) => exit_codes::EMPTY_INDEX,
            Self::InvalidInput(_) | Self::Config(_) | Self::ConfigurationConflict(_) => {
                exit_codes::INVALID_INPUT
            }
            Self::ModelLoad(_) => exit_codes::MODEL_UNAVAILABLE,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}

impl From<rusqlite::Error> for SemcodeError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StoreQuery(e.to_string())
    }
}
