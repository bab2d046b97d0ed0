use ::console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::console::Console;

/// Counters behind the live display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn finished(&self) -> usize {
        self.completed + self.failed
    }

    pub fn is_done(&self) -> bool {
        self.finished() == self.total
    }

    /// Count one finished task. Returns false (and counts nothing) once `total` is reached.
    pub fn record(&mut self, success: bool) -> bool {
        if self.finished() >= self.total {
            return false;
        }
        if success {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        true
    }
}

/// One status row in the per-site table
pub struct SiteRow {
    bar: ProgressBar,
}

impl Drop for SiteRow {
    // Reached without complete/fail only when the task unwinds
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon_with_message(format!("{}", style("Aborted").red()));
        }
    }
}

/// Overall bar plus optional per-site rows, drawn through the shared [`Console`]
pub struct SweepProgress {
    console: Arc<Console>,
    overall: ProgressBar,
    state: Mutex<ProgressState>,
    site_rows: bool,
}

impl SweepProgress {
    pub fn new(console: Arc<Console>, label: &str, total: usize, site_rows: bool) -> Self {
        let overall_style = ProgressStyle::with_template(
            "{prefix:.bold.blue} [{bar:40.cyan/blue}] {percent:>3}% • {pos}/{len} sites • ETA {eta} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        let overall = console.multi().add(ProgressBar::new(total as u64));
        overall.set_style(overall_style);
        overall.set_prefix(format!("Processing sites ({label})"));

        Self {
            console,
            overall,
            state: Mutex::new(ProgressState::new(total)),
            site_rows,
        }
    }

    /// Add a "Running" row for a site
    pub fn start_site(&self, site_id: &str, site_name: &str) -> SiteRow {
        if !self.site_rows {
            return SiteRow {
                bar: ProgressBar::hidden(),
            };
        }

        let row_style = ProgressStyle::with_template("{spinner:.yellow} {prefix:<40} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        let bar = self.console.multi().add(ProgressBar::new_spinner());
        bar.set_style(row_style);
        bar.set_prefix(format!("{} {}", style(site_id).cyan(), site_name));
        bar.set_message(format!("{}", style("Running...").yellow()));
        if self.console.draws_progress() {
            bar.enable_steady_tick(Duration::from_millis(120));
        }

        SiteRow { bar }
    }

    pub fn page_fetched(&self, row: &SiteRow, pages: usize) {
        row.bar
            .set_message(format!("{} {} pages", style("Running...").yellow(), pages));
    }

    pub fn complete_site(&self, row: SiteRow, records: usize, pages: usize) {
        row.bar.set_style(Self::finished_row_style());
        row.bar.finish_with_message(format!(
            "{} {} records, {} pages",
            style("Completed").green().bold(),
            records,
            pages
        ));
        self.advance(true);
    }

    pub fn fail_site(&self, row: SiteRow, pages: usize) {
        row.bar.set_style(Self::finished_row_style());
        row.bar
            .finish_with_message(format!("{} after {} pages", style("Failed").red().bold(), pages));
        self.advance(false);
    }

    /// Count a task that never got a row (e.g. it panicked before reporting)
    pub fn fail_unreported(&self) {
        self.advance(false);
    }

    pub fn snapshot(&self) -> ProgressState {
        *self.lock_state()
    }

    pub fn finish(&self) {
        let state = self.snapshot();
        self.overall.finish_with_message(format!(
            "{} completed, {} failed",
            style(state.completed).green(),
            style(state.failed).red()
        ));
        // Clear the live display so the summary prints cleanly below
        let _ = self.console.multi().clear();
    }

    fn advance(&self, success: bool) {
        let mut state = self.lock_state();
        if state.record(success) {
            self.overall.set_position(state.finished() as u64);
        } else {
            tracing::warn!("progress already at {} of {}; ignoring extra update", state.finished(), state.total);
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn finished_row_style() -> ProgressStyle {
        ProgressStyle::with_template("  {prefix:<40} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}
