//! MCP tool definitions and handlers

use crate::protocol::*;
use anyhow::{Context, Result};
use semcode_core::{
    AppContext, IndexReport, ProgressCallback, SearchOptions, SearchOutcome, SemcodeError,
};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

/// Stale files listed in an `index_status` response
const STALE_FILES_SHOWN: usize = 20;

pub fn search_code_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "search_code".to_string(),
        description: "Semantic search over a codebase. Indexes the project on first use \
                      and refreshes changed files before answering."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural language description or identifier to look for"
                },
                "project_path": {
                    "type": "string",
                    "description": "Absolute path to the project root"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum results (default: 10)",
                    "default": 10
                }
            },
            "required": ["query", "project_path"]
        }),
    }
}

pub fn index_codebase_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "index_codebase".to_string(),
        description: "Index a codebase for semantic search. Only changed files are \
                      re-embedded unless force is set."
            .to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "project_path": {
                    "type": "string",
                    "description": "Absolute path to the project root"
                },
                "force": {
                    "type": "boolean",
                    "description": "Rebuild the whole index (default: false)",
                    "default": false
                }
            },
            "required": ["project_path"]
        }),
    }
}

pub fn index_status_tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "index_status".to_string(),
        description: "Show index statistics and files changed since the last pass".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "project_path": {
                    "type": "string",
                    "description": "Absolute path to the project root"
                }
            },
            "required": ["project_path"]
        }),
    }
}

fn project_path(args: &Value) -> Result<PathBuf> {
    args.get("project_path")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .context("Missing required parameter: project_path")
}

pub async fn handle_search_code(
    ctx: &AppContext,
    args: Value,
    progress: Option<ProgressCallback>,
) -> Result<ToolResult> {
    let query = args
        .get("query")
        .and_then(|v| v.as_str())
        .context("Missing required parameter: query")?;
    let project = project_path(&args)?;
    let limit = args
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|n| n.clamp(1, 100) as usize)
        .unwrap_or(10);

    let options = SearchOptions {
        limit,
        min_score: ctx.settings().ranking.min_score,
    };
    let model_was_loaded = ctx.embedder_loaded();
    let outcome = ctx
        .search_code_with_progress(&project, query, &options, progress)
        .await?;

    let summary = search_summary(query, &outcome);
    let structured = search_payload(&outcome, model_was_loaded);
    Ok(ToolResult::success(summary, structured))
}

fn search_summary(query: &str, outcome: &SearchOutcome) -> String {
    if outcome.results.is_empty() {
        return format!(
            "No results for '{}' above the score threshold ({} candidates filtered)",
            query, outcome.filtered_count
        );
    }

    let mut summary = format!("Found {} results for '{}':\n", outcome.results.len(), query);
    for result in &outcome.results {
        let chunk = &result.chunk;
        summary.push_str(&format!(
            "\n{}:{}-{} {} {} (score {:.3})",
            chunk.file_path,
            chunk.line_start,
            chunk.line_end,
            chunk.kind.as_str(),
            chunk.name,
            result.score
        ));
    }
    summary
}

fn search_payload(outcome: &SearchOutcome, model_was_loaded: bool) -> Value {
    let results: Vec<Value> = outcome
        .results
        .iter()
        .map(|r| {
            serde_json::json!({
                "file_path": r.chunk.file_path,
                "line_start": r.chunk.line_start,
                "line_end": r.chunk.line_end,
                "name": r.chunk.name,
                "chunk_type": r.chunk.kind.as_str(),
                "content": r.content,
                "score": (r.score * 1000.0).round() / 1000.0,
                "truncated": r.truncated,
            })
        })
        .collect();

    let unique_files: HashSet<&str> = outcome
        .results
        .iter()
        .map(|r| r.chunk.file_path.as_str())
        .collect();
    let chars: usize = outcome.results.iter().map(|r| r.content.len()).sum();

    let mut debug = serde_json::json!({
        "timings": outcome.timings,
        "stats": {
            "results_count": outcome.results.len(),
            "raw_count": outcome.raw_count,
            "filtered_out": outcome.filtered_count,
            "unique_files": unique_files.len(),
            "tokens_estimate": chars / 4,
            "model_was_loaded": model_was_loaded,
        }
    });
    if let Some(report) = &outcome.index_report {
        debug["index_result"] = report_payload(report);
    }

    serde_json::json!({
        "results": results,
        "debug": debug,
    })
}

fn report_payload(report: &IndexReport) -> Value {
    serde_json::json!({
        "files_processed": report.files_indexed,
        "chunks_added": report.chunks_added,
        "chunks_removed": report.chunks_removed,
        "files_deleted": report.files_deleted,
        "files_failed": report.files_failed,
        "duration_seconds": (report.duration_ms as f64 / 10.0).round() / 100.0,
    })
}

pub async fn handle_index_codebase(
    ctx: &AppContext,
    args: Value,
    progress: Option<ProgressCallback>,
) -> Result<ToolResult> {
    let project = project_path(&args)?;
    let force = args.get("force").and_then(|v| v.as_bool()).unwrap_or(false);

    let report = ctx.index_codebase(&project, force, progress).await?;

    let summary = format!(
        "Indexed {} files ({} unchanged, {} failed, {} deleted)\n\
         Chunks: {} added, {} removed\n\
         Took {:.2}s",
        report.files_indexed,
        report.files_unchanged,
        report.files_failed,
        report.files_deleted,
        report.chunks_added,
        report.chunks_removed,
        report.duration_ms as f64 / 1000.0
    );
    Ok(ToolResult::success(summary, report_payload(&report)))
}

pub async fn handle_index_status(ctx: &AppContext, args: Value) -> Result<ToolResult> {
    let project = project_path(&args)?;
    let status = ctx.index_status(&project).await?;

    let summary = if status.is_indexed {
        format!(
            "Index: {} chunks across {} files\n\
             Last updated: {}\n\
             Stale files: {}",
            status.chunks_count,
            status.files_count,
            status.last_updated.as_deref().unwrap_or("unknown"),
            status.stale_files.len()
        )
    } else {
        format!(
            "Not indexed yet ({} files waiting). Run index_codebase or search_code to build it.",
            status.stale_files.len()
        )
    };

    let structured = serde_json::json!({
        "is_indexed": status.is_indexed,
        "files_count": status.files_count,
        "chunks_count": status.chunks_count,
        "last_updated": status.last_updated,
        "stale_files_count": status.stale_files.len(),
        "stale_files": status.stale_files.iter().take(STALE_FILES_SHOWN).collect::<Vec<_>>(),
    });
    Ok(ToolResult::success(summary, structured))
}

/// Tool-level failure text; an empty index reads differently from a broken one
pub fn error_result(error: &anyhow::Error) -> ToolResult {
    let text = match error.downcast_ref::<SemcodeError>() {
        Some(SemcodeError::EmptyIndex(detail)) => format!(
            "No indexed code to search: {}. Supported files are .py, .rs and .md.",
            detail
        ),
        Some(SemcodeError::InvalidInput(detail)) => format!("Invalid input: {}", detail),
        Some(e @ SemcodeError::ModelLoad(_)) => e.to_string(),
        Some(e) => format!("Search infrastructure error: {}", e),
        None => format!("Error: {}", error),
    };
    ToolResult::failure(text)
}
