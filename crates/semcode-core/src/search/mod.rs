//! Search engine module
//!
//! Provides:
//! - Concurrent vector and BM25 keyword retrieval
//! - Hybrid ranking with exact-match and recency boosts
//! - Same-file clustering of the final result list

mod hybrid;
mod ranking;

pub use hybrid::HybridSearcher;
pub use ranking::{contains_phrase, merge_hits, rank, Candidate, RankedResults};

use crate::embedding::identifier_tokens;
use crate::index::{Chunk, IndexReport};
use serde::Serialize;

/// Search options
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum number of results
    pub limit: usize,
    /// Minimum score threshold (0.0 - 1.0)
    pub min_score: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_score: 0.3,
        }
    }
}

/// Which retrieval produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Vector,
    Keyword,
    Both,
}

/// Ranked search hit
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Final score in [0, 1]
    pub score: f64,
    pub source: SearchSource,
    /// Chunk content, cut to the configured line budget
    pub content: String,
    pub truncated: bool,
    pub mtime: f64,
    /// The whole query occurs verbatim in the chunk
    pub exact_match: bool,
}

/// Wall-clock breakdown of one search
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchTimings {
    pub embedding_ms: f64,
    pub search_ms: f64,
    pub ranking_ms: f64,
    pub total_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexing_ms: Option<f64>,
}

/// Everything a search produced, including any indexing it triggered
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    /// Distinct candidates before thresholding
    pub raw_count: usize,
    /// Candidates dropped by the score threshold
    pub filtered_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_report: Option<IndexReport>,
    pub timings: SearchTimings,
}

/// Common English stop words to remove from natural language queries
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "he", "in",
    "is", "it", "its", "of", "on", "that", "the", "to", "was", "will", "with", "does", "do",
    "did", "can", "could", "should", "would", "what", "where", "when", "why", "how", "who",
    "which", "this", "these", "those", "there", "here", "code", "function", "find",
];

/// Significant lower-case query tokens: whole identifiers and their parts,
/// minus stop words and tokens shorter than three characters
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for (token, _) in identifier_tokens(query) {
        if token.chars().count() < 3 || STOP_WORDS.contains(&token.as_str()) {
            continue;
        }
        if !terms.contains(&token) {
            terms.push(token);
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_terms_drop_stop_words() {
        let terms = query_terms("where is the config loaded");
        assert_eq!(terms, vec!["config", "loaded"]);
    }

    #[test]
    fn test_query_terms_split_identifiers() {
        let terms = query_terms("parse_config parseConfig");
        assert!(terms.contains(&"parse_config".to_string()));
        assert!(terms.contains(&"parseconfig".to_string()));
        assert!(terms.contains(&"parse".to_string()));
        assert!(terms.contains(&"config".to_string()));
        assert_eq!(terms.iter().filter(|t| *t == "parse").count(), 1);
    }

    #[test]
    fn test_query_terms_can_be_empty() {
        assert!(query_terms("how do I").is_empty());
    }
}
