//! JSON output formatter

use semcode_core::SearchOutcome;

pub fn format_results(outcome: &SearchOutcome) -> String {
    let results: Vec<serde_json::Value> = outcome
        .results
        .iter()
        .map(|r| {
            serde_json::json!({
                "file_path": r.chunk.file_path,
                "line_start": r.chunk.line_start,
                "line_end": r.chunk.line_end,
                "name": r.chunk.name,
                "chunk_type": r.chunk.kind.as_str(),
                "score": (r.score * 1000.0).round() / 1000.0,
                "source": r.source,
                "content": r.content,
                "truncated": r.truncated,
            })
        })
        .collect();

    let output = serde_json::json!({
        "results": results,
        "filtered_out": outcome.filtered_count,
        "timings": outcome.timings,
        "index_result": outcome.index_report,
    });

    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string()) + "\n"
}
