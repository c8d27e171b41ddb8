//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "semcode")]
#[command(author, version, about = "Semantic code search for local projects")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index a project (incremental unless --force)
    Index(IndexArgs),

    /// Search a project, indexing it first if needed
    Search(SearchArgs),

    /// Show index status for a project
    Status(StatusArgs),

    /// Start MCP server on stdio
    Mcp,
}

#[derive(Args)]
pub struct IndexArgs {
    /// Project root
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Drop the existing index and rebuild it
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Project root
    #[arg(short, long, default_value = ".")]
    pub project: PathBuf,

    /// Maximum results
    #[arg(short = 'n', long, default_value = "10")]
    pub limit: usize,

    /// Minimum score (0-1); defaults to the configured threshold
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Show full chunk content
    #[arg(long)]
    pub full: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Project root
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Cli,
    Json,
}
