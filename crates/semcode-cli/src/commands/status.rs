//! Status command

use crate::app::{OutputFormat, StatusArgs};
use anyhow::Result;
use semcode_core::AppContext;

/// Stale files listed before eliding the rest
const STALE_SHOWN: usize = 20;

pub async fn run(args: StatusArgs, ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let status = ctx.index_status(&args.path).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        OutputFormat::Cli => {
            println!("Index dir:       {}", ctx.index_dir_for(&args.path)?.display());
            println!("Indexed:         {}", if status.is_indexed { "yes" } else { "no" });
            println!(
                "Last updated:    {}",
                status.last_updated.as_deref().unwrap_or("never")
            );
            println!("Files:           {}", status.files_count);
            println!("Chunks:          {}", status.chunks_count);
            println!("Stale files:     {}", status.stale_files.len());
            for file in status.stale_files.iter().take(STALE_SHOWN) {
                println!("  {}", file);
            }
            if status.stale_files.len() > STALE_SHOWN {
                println!("  ... and {} more", status.stale_files.len() - STALE_SHOWN);
            }
        }
    }
    Ok(())
}
