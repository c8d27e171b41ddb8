//! Search command

use crate::app::{OutputFormat, SearchArgs};
use crate::output::{print_search_results, FormatOptions};
use anyhow::Result;
use semcode_core::{AppContext, SearchOptions};

pub async fn run(args: SearchArgs, ctx: &AppContext, format: OutputFormat) -> Result<()> {
    let query = args.query.join(" ");
    let options = SearchOptions {
        limit: args.limit.max(1),
        min_score: args
            .min_score
            .unwrap_or(ctx.settings().ranking.min_score),
    };

    let outcome = ctx.search_code(&args.project, &query, &options).await?;

    let format_opts = FormatOptions { full: args.full };
    print_search_results(&outcome, format, &format_opts)?;
    Ok(())
}
