//! Styled terminal output for s1-sweep
//!
//! Human-readable messages share the [`Console`] sink with log records and
//! the progress display (stderr), so they never tear a progress redraw.
//! Machine-readable output (JSON summaries, config dumps) goes to stdout
//! through [`Output::data`]. Errors are shown even in quiet mode.

use console::style;
use std::sync::Arc;

use crate::parallel::Console;

/// Output handler for consistent CLI formatting
pub struct Output {
    console: Arc<Console>,
    verbose: bool,
    quiet: bool,
}

impl Output {
    pub fn new(console: Arc<Console>, verbose: bool, quiet: bool) -> Self {
        Self { console, verbose, quiet }
    }

    pub fn console(&self) -> Arc<Console> {
        self.console.clone()
    }

    fn line(&self, line: String) {
        self.console.println(&line);
    }

    /// Print machine-readable output on stdout, regardless of quiet mode
    pub fn data(&self, text: &str) {
        println!("{text}");
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.line(format!("{} {}", style("✔").green(), message));
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        // Errors are always shown, even in quiet mode
        self.line(format!("{} {}", style("✖").red(), message));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            self.line(format!("{} {}", style("⚠").yellow(), message));
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.line(format!("{} {}", style("ℹ").blue(), message));
        }
    }

    /// Print a verbose message (only if verbose mode is enabled)
    pub fn verbose(&self, message: &str) {
        if self.verbose && !self.quiet {
            self.line(format!("{} {}", style("ℹ").dim(), style(message).dim()));
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Print a header/title
    pub fn header(&self, title: &str) {
        if !self.quiet {
            self.line(format!("\n{}", style(title).bold().underlined()));
        }
    }

    /// Print a category header
    pub fn category(&self, category: &str) {
        if !self.quiet {
            self.line(format!("\n{}", style(category).bold().cyan()));
        }
    }

    /// Print a table row
    pub fn table_row(&self, key: &str, value: &str) {
        if !self.quiet {
            self.line(format!("  {:<20} {}", style(key).dim(), value));
        }
    }

    /// Print a key-value pair, optionally highlighting the value
    pub fn key_value(&self, key: &str, value: &str, highlight: bool) {
        if !self.quiet {
            let styled_value = if highlight {
                style(value).green().bold()
            } else {
                style(value).white()
            };
            self.line(format!("  {} {}", style(key).dim(), styled_value));
        }
    }

    /// Print summary statistics
    pub fn summary_stats(&self, label: &str, value: usize) {
        if !self.quiet {
            self.line(format!("  {} {}", style(label).dim(), style(value.to_string()).bold()));
        }
    }

    /// Print a status indicator
    pub fn status_indicator(&self, status: &str, message: &str, is_success: bool) {
        if !self.quiet {
            let (icon, color) = if is_success {
                ("✓", style(status).green())
            } else {
                ("✗", style(status).red())
            };
            self.line(format!("{} {} {}", style(icon).bold(), color.bold(), message));
        }
    }

    pub fn blank_line(&self) {
        if !self.quiet {
            self.line(String::new());
        }
    }
}
