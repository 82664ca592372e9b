//! Console progress output.

use std::io::Write;

use crossterm::style::Stylize;
use depforge_core::Reporter;

/// Writes progress lines to stderr so stdout stays machine-readable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn line(&self, text: &str) {
        if self.quiet {
            return;
        }
        emit(text);
    }
}

fn emit(text: &str) {
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "{text}");
}

fn section_line(title: &str) -> String {
    format!("{} {}", "==>".cyan().bold(), title.bold())
}

fn step_line(name: &str, detail: &str) -> String {
    format!("  {} {name}: {detail}", "->".cyan())
}

fn skipped_line(name: &str, detail: &str) -> String {
    format!("  {} {name}: {}", "--".dark_grey(), detail.dark_grey())
}

fn done_line(name: &str, detail: &str) -> String {
    format!("  {} {name}: {detail}", "ok".green().bold())
}

fn failed_line(name: &str, reason: &str) -> String {
    format!("  {} {name}: {}", "!!".red().bold(), reason.red())
}

fn warning_line(msg: &str) -> String {
    format!("  {} {msg}", "warning:".yellow().bold())
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        self.line(&section_line(title));
    }

    fn step(&self, name: &str, detail: &str) {
        self.line(&step_line(name, detail));
    }

    fn skipped(&self, name: &str, detail: &str) {
        self.line(&skipped_line(name, detail));
    }

    fn done(&self, name: &str, detail: &str) {
        self.line(&done_line(name, detail));
    }

    // Failures and warnings are printed even in quiet mode.
    fn failed(&self, name: &str, reason: &str) {
        emit(&failed_line(name, reason));
    }

    fn tool_output(&self, tool: &str, text: &str) {
        for l in text.lines().filter(|l| !l.trim().is_empty()) {
            self.line(&format!("     {} {l}", format!("[{tool}]").dark_grey()));
        }
    }

    fn info(&self, msg: &str) {
        self.line(&format!("  {msg}"));
    }

    fn warning(&self, msg: &str) {
        emit(&warning_line(msg));
    }
}
