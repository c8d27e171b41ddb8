//! Progress reporting for indexing passes

use semcode_core::index::{IndexProgress, ProgressCallback};
use std::io::{self, Write};

/// Writes the current stage to stderr, overwriting the previous line
pub struct ProgressReporter;

impl ProgressReporter {
    pub fn callback() -> ProgressCallback {
        Box::new(|p: IndexProgress| {
            eprint!(
                "\r{:>3.0}% {:<9} {:<50}",
                p.percent,
                p.stage.as_str(),
                truncate(&p.message, 50)
            );
            io::stderr().flush().ok();
        })
    }

    pub fn finish() {
        eprint!("\r{:<66}\r", "");
        io::stderr().flush().ok();
    }
}

fn truncate(message: &str, width: usize) -> String {
    if message.chars().count() <= width {
        return message.to_string();
    }
    let tail: String = message
        .chars()
        .rev()
        .take(width - 3)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_path_tail() {
        assert_eq!(truncate("short", 10), "short");
        let cut = truncate("/very/long/path/to/some/module.py", 15);
        assert_eq!(cut.chars().count(), 15);
        assert!(cut.starts_with("..."));
        assert!(cut.ends_with("module.py"));
    }
}
