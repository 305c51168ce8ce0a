//! Output formatting for CLI commands.

use colored::Colorize;
use corral_provision::ReportSink;

/// Reports progress lines to the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSink;

impl ReportSink for TerminalSink {
    fn info(&self, line: &str) {
        println!("{line}");
    }

    fn error(&self, line: &str) {
        eprintln!("{}", line.red());
    }
}
