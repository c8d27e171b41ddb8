//! Index command

use crate::app::{IndexArgs, OutputFormat};
use crate::progress::ProgressReporter;
use anyhow::Result;
use semcode_core::AppContext;

pub async fn run(args: IndexArgs, ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let progress = match format {
        OutputFormat::Cli => Some(ProgressReporter::callback()),
        OutputFormat::Json => None,
    };

    let result = ctx.index_codebase(&args.path, args.force, progress).await;
    if format == OutputFormat::Cli {
        ProgressReporter::finish();
    }
    let report = result?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Cli => {
            println!("Files scanned:   {}", report.files_scanned);
            println!("  Indexed:       {}", report.files_indexed);
            println!("  Unchanged:     {}", report.files_unchanged);
            println!("  Failed:        {}", report.files_failed);
            println!("  Deleted:       {}", report.files_deleted);
            println!();
            println!("Chunks added:    {}", report.chunks_added);
            println!("Chunks removed:  {}", report.chunks_removed);
            println!("Took:            {:.2}s", report.duration_ms as f64 / 1000.0);
        }
    }
    Ok(())
}
