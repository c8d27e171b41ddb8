//! Hybrid scoring, thresholding, ordering and per-file grouping of candidates

use super::{SearchOptions, SearchResult, SearchSource};
use crate::config::RankingConfig;
use crate::db::ScoredChunk;
use crate::embedding::identifier_tokens;
use crate::index::Chunk;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// A chunk found by at least one retrieval
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub chunk: Chunk,
    pub mtime: f64,
    pub vector_score: Option<f64>,
    pub keyword_score: Option<f64>,
}

impl Candidate {
    pub fn source(&self) -> SearchSource {
        match (self.vector_score.is_some(), self.keyword_score.is_some()) {
            (true, true) => SearchSource::Both,
            (false, true) => SearchSource::Keyword,
            _ => SearchSource::Vector,
        }
    }
}

/// Final ranking of one query
#[derive(Debug, Clone, Default)]
pub struct RankedResults {
    pub results: Vec<SearchResult>,
    pub raw_count: usize,
    pub filtered_count: usize,
}

/// Merge both retrievals by chunk id, keeping first-seen order
pub fn merge_hits(vector: Vec<ScoredChunk>, keyword: Vec<ScoredChunk>) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::with_capacity(vector.len() + keyword.len());
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for hit in vector {
        if by_id.contains_key(&hit.id) {
            continue;
        }
        by_id.insert(hit.id.clone(), candidates.len());
        candidates.push(Candidate {
            id: hit.id,
            chunk: hit.chunk,
            mtime: hit.mtime,
            vector_score: Some(hit.score as f64),
            keyword_score: None,
        });
    }

    for hit in keyword {
        match by_id.get(&hit.id) {
            Some(&idx) => {
                let existing = candidates[idx].keyword_score.unwrap_or(0.0);
                candidates[idx].keyword_score = Some(existing.max(hit.score as f64));
            }
            None => {
                by_id.insert(hit.id.clone(), candidates.len());
                candidates.push(Candidate {
                    id: hit.id,
                    chunk: hit.chunk,
                    mtime: hit.mtime,
                    vector_score: None,
                    keyword_score: Some(hit.score as f64),
                });
            }
        }
    }

    candidates
}

/// Lower-case with every whitespace run collapsed to one space
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `phrase` occurs in `text` with word boundaries at both ends.
///
/// Both sides must already be normalized.
pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let starts_word = phrase.chars().next().is_some_and(is_word_char);
    let ends_word = phrase.chars().last().is_some_and(is_word_char);

    text.match_indices(phrase).any(|(start, _)| {
        let before_ok = !starts_word || !text[..start].chars().last().is_some_and(is_word_char);
        let after_ok =
            !ends_word || !text[start + phrase.len()..].chars().next().is_some_and(is_word_char);
        before_ok && after_ok
    })
}

fn matched_fraction(content: &str, terms: &[String]) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let tokens: HashSet<String> = identifier_tokens(content).into_iter().map(|(t, _)| t).collect();
    let matched = terms.iter().filter(|t| tokens.contains(*t)).count();
    matched as f64 / terms.len() as f64
}

/// Multiplier in [1, 1 + recency_boost], decaying linearly to 1 over the window
pub fn recency_factor(mtime: f64, now: f64, config: &RankingConfig) -> f64 {
    if config.recency_window_secs <= 0.0 {
        return 1.0;
    }
    let age = (now - mtime).max(0.0);
    if age >= config.recency_window_secs {
        return 1.0;
    }
    1.0 + config.recency_boost * (1.0 - age / config.recency_window_secs)
}

fn cap(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Cut `content` to `max_lines` lines, marking the cut
pub fn truncate_content(content: &str, max_lines: usize) -> (String, bool) {
    let lines: Vec<&str> = content.split('\n').collect();
    if max_lines == 0 || lines.len() <= max_lines {
        return (content.to_string(), false);
    }
    (
        format!("{}{}", lines[..max_lines].join("\n"), TRUNCATION_MARKER),
        true,
    )
}

/// Score, filter, order and group candidates for `query`.
///
/// `now` is the reference time for the recency boost, in seconds since the
/// epoch.
pub fn rank(
    candidates: Vec<Candidate>,
    query: &str,
    terms: &[String],
    config: &RankingConfig,
    options: &SearchOptions,
    now: f64,
) -> RankedResults {
    let raw_count = candidates.len();
    let phrase = normalize(query);

    let mut scored: Vec<(Candidate, f64, bool)> = candidates
        .into_iter()
        .map(|candidate| {
            let content = normalize(&candidate.chunk.content);
            let exact = contains_phrase(&content, &phrase);

            let base = match candidate.vector_score {
                Some(similarity) => similarity.max(0.0),
                None => config.keyword_weight * candidate.keyword_score.unwrap_or(0.0),
            };
            let mut score = cap(base);

            if exact {
                score = cap(score * (1.0 + config.phrase_boost));
            } else {
                let fraction = matched_fraction(&candidate.chunk.content, terms);
                if fraction > 0.0 {
                    score = cap(score * (1.0 + config.partial_boost * fraction));
                }
            }

            score = cap(score * recency_factor(candidate.mtime, now, config));
            (candidate, score, exact)
        })
        .collect();

    let best_other = scored
        .iter()
        .filter(|(_, _, exact)| !exact)
        .map(|(_, score, _)| *score)
        .fold(0.0, f64::max);
    let floor = config.exact_match_floor.max(best_other);
    for (_, score, exact) in scored.iter_mut() {
        if *exact {
            *score = cap(score.max(floor));
        }
    }

    scored.retain(|(_, score, _)| *score >= options.min_score);
    let filtered_count = raw_count - scored.len();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| b.0.mtime.partial_cmp(&a.0.mtime).unwrap_or(Ordering::Equal))
            .then_with(|| a.0.chunk.file_path.cmp(&b.0.chunk.file_path))
            .then_with(|| a.0.chunk.line_start.cmp(&b.0.chunk.line_start))
    });
    scored.truncate(options.limit);

    let results: Vec<SearchResult> = scored
        .into_iter()
        .map(|(candidate, score, exact)| {
            let (content, truncated) =
                truncate_content(&candidate.chunk.content, config.max_result_lines);
            SearchResult {
                source: candidate.source(),
                mtime: candidate.mtime,
                chunk: candidate.chunk,
                score,
                content,
                truncated,
                exact_match: exact,
            }
        })
        .collect();

    RankedResults {
        results: group_by_file(results),
        raw_count,
        filtered_count,
    }
}

/// Pull each file's hits together at the position of its best hit
fn group_by_file(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<SearchResult>> = HashMap::new();
    for result in results {
        let file = result.chunk.file_path.clone();
        if !groups.contains_key(&file) {
            order.push(file.clone());
        }
        groups.entry(file).or_default().push(result);
    }
    order
        .into_iter()
        .flat_map(|file| groups.remove(&file).unwrap_or_default())
        .collect()
}
