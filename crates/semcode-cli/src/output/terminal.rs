//! Terminal output formatter

use super::FormatOptions;
use semcode_core::SearchOutcome;
use std::io::{IsTerminal, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Lines of content shown per result without `--full`
const PREVIEW_LINES: usize = 5;

pub fn print_results(outcome: &SearchOutcome, options: &FormatOptions) -> std::io::Result<()> {
    let choice = if std::io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    let mut out = StandardStream::stdout(choice);

    if outcome.results.is_empty() {
        writeln!(
            out,
            "No results above the score threshold ({} filtered)",
            outcome.filtered_count
        )?;
        return Ok(());
    }

    let mut previous_file: Option<&str> = None;
    for result in &outcome.results {
        let chunk = &result.chunk;
        if previous_file != Some(chunk.file_path.as_str()) {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
            writeln!(out, "{}", chunk.file_path)?;
            out.reset()?;
            previous_file = Some(chunk.file_path.as_str());
        }

        let score_pct = (result.score * 100.0).round() as u32;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{:>5}%", score_pct)?;
        out.reset()?;
        write!(
            out,
            " {}-{} {} ",
            chunk.line_start,
            chunk.line_end,
            chunk.kind.as_str()
        )?;
        out.set_color(ColorSpec::new().set_bold(true))?;
        write!(out, "{}", chunk.name)?;
        out.reset()?;
        if result.exact_match {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
            write!(out, " [exact]")?;
            out.reset()?;
        }
        writeln!(out)?;

        let limit = if options.full { usize::MAX } else { PREVIEW_LINES };
        for (i, line) in result.content.lines().take(limit).enumerate() {
            writeln!(out, "  {:>5} {}", chunk.line_start + i, line)?;
        }
        if !options.full && result.content.lines().count() > PREVIEW_LINES {
            writeln!(out, "        ...")?;
        }
    }

    if let Some(report) = &outcome.index_report {
        writeln!(
            out,
            "\n(indexed {} files, {} deleted before searching)",
            report.files_indexed, report.files_deleted
        )?;
    }
    Ok(())
}
