//! Output formatters

pub mod json;
pub mod terminal;

use crate::app::OutputFormat;
use semcode_core::SearchOutcome;

/// Format options
pub struct FormatOptions {
    pub full: bool,
}

/// Print search results to stdout
pub fn print_search_results(
    outcome: &SearchOutcome,
    format: OutputFormat,
    options: &FormatOptions,
) -> std::io::Result<()> {
    match format {
        OutputFormat::Json => {
            print!("{}", json::format_results(outcome));
            Ok(())
        }
        OutputFormat::Cli => terminal::print_results(outcome, options),
    }
}
