//! Semcode CLI
//!
//! Semantic code search for local projects.

use anyhow::Result;
use clap::Parser;
use semcode_core::{error::exit_codes, AppContext, SemcodeError, Settings};
use tracing_subscriber::EnvFilter;

mod app;
mod commands;
mod output;
mod progress;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let debug = std::env::var("SEMCODE_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let level = if debug {
        tracing::Level::DEBUG
    } else if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    // stdout carries results and MCP traffic, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load()?;
    let ctx = AppContext::new(settings)?;

    match cli.command {
        Commands::Index(args) => commands::index::run(args, &ctx, cli.format).await,
        Commands::Search(args) => commands::search::run(args, &ctx, cli.format).await,
        Commands::Status(args) => commands::status::run(args, &ctx, cli.format).await,
        Commands::Mcp => semcode_mcp::start_server(&ctx).await,
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<SemcodeError>()
        .map(SemcodeError::exit_code)
        .unwrap_or(exit_codes::GENERAL_ERROR)
}
