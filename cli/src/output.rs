//! Styled terminal output for the `campus` commands.

use std::fmt::Display;

use console::{Term, style};

/// Terminal output helper for consistent styled output.
pub struct Output {
    term: Term,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    fn line(&self, line: impl AsRef<str>) {
        drop(self.term.write_line(line.as_ref()));
    }

    pub fn success(&self, message: impl Display) {
        self.line(format!("{} {}", style("✓").green().bold(), message));
    }

    pub fn error(&self, message: impl Display) {
        self.line(format!("{} {}", style("✗").red().bold(), message));
    }

    pub fn warning(&self, message: impl Display) {
        self.line(format!("{} {}", style("⚠").yellow().bold(), message));
    }

    pub fn info(&self, message: impl Display) {
        self.line(format!("{} {}", style("ℹ").blue().bold(), message));
    }

    pub fn print(&self, message: impl Display) {
        self.line(message.to_string());
    }

    pub fn newline(&self) {
        self.line("");
    }

    pub fn header(&self, message: impl Display) {
        self.line(style(message).bold().cyan().to_string());
    }

    pub fn dim(&self, message: impl Display) {
        self.line(style(message).dim().to_string());
    }

    /// Print a labeled value with indentation.
    pub fn labeled(&self, label: impl Display, value: impl Display) {
        self.line(format!("  {}: {}", style(label).dim(), value));
    }

    /// Print one staged file: name, kind and size.
    pub fn file_item(&self, name: impl Display, kind: impl Display, size: impl Display) {
        self.line(format!(
            "  {} {} ({}) - {}",
            style("📄").bold(),
            style(name).white().bold(),
            style(kind).dim(),
            style(size).cyan()
        ));
    }

    pub fn total(&self, label: impl Display, count: usize) {
        self.line(format!(
            "\n{}: {}",
            style(label).bold(),
            style(format!("{count} file(s)")).cyan()
        ));
    }
}
