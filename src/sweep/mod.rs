//! Per-site sweeps
//!
//! A sweep takes a list of sites and, for one resource (alerts, threats,
//! agents), fetches every page of that resource for each site on the worker
//! pool. Sites are independent: one failing never stops the others, and the
//! final counts add up to the number of sites submitted. An interrupted
//! sweep stops dispatching and reports the sites that had started.

pub mod sites;

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use crate::api::{PageSource, QueryParams, Resource, fetch_paginated};
use crate::parallel::{Console, ProgressState, SweepProgress, WorkOutcome, WorkerPool};

pub use sites::{discover_sites, select_sites, tasks_from_ids, tasks_from_sites};

/// One unit of work: every page of a resource for one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTask {
    pub site_id: String,
    pub site_name: String,
}

impl SiteTask {
    pub fn new(site_id: &str, site_name: &str) -> Self {
        Self {
            site_id: site_id.to_string(),
            site_name: site_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Completed,
    Failed { error: String },
}

/// Result slot filled in for each task
#[derive(Debug)]
pub struct SiteOutcome<T> {
    pub task: SiteTask,
    pub pages: usize,
    pub records: Vec<T>,
    pub status: TaskStatus,
}

impl<T> SiteOutcome<T> {
    fn failed(task: SiteTask, pages: usize, error: String) -> Self {
        Self {
            task,
            pages,
            records: Vec::new(),
            status: TaskStatus::Failed { error },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// Everything a sweep produced
#[derive(Debug)]
pub struct SweepReport<T> {
    pub resource: &'static str,
    pub outcomes: Vec<SiteOutcome<T>>,
    pub progress: ProgressState,
    pub elapsed: Duration,
    /// Cancelled before every site ran; `outcomes` holds the sites that did
    pub interrupted: bool,
}

/// Serializable per-site line of a [`SweepSummary`]
#[derive(Debug, Clone, Serialize)]
pub struct SiteSummary {
    pub site_id: String,
    pub site_name: String,
    pub records: usize,
    pub pages: usize,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Record-free view of a [`SweepReport`]
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub resource: &'static str,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub records: usize,
    pub elapsed_ms: u64,
    pub interrupted: bool,
    pub sites: Vec<SiteSummary>,
}

impl<T> SweepReport<T> {
    pub fn failed(&self) -> usize {
        self.progress.failed
    }

    pub fn record_count(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.records.len()).sum()
    }

    pub fn summary(&self) -> SweepSummary {
        let mut sites: Vec<SiteSummary> = self
            .outcomes
            .iter()
            .map(|outcome| {
                let (status, error) = match &outcome.status {
                    TaskStatus::Completed => ("completed", None),
                    TaskStatus::Failed { error } => ("failed", Some(error.clone())),
                };
                SiteSummary {
                    site_id: outcome.task.site_id.clone(),
                    site_name: outcome.task.site_name.clone(),
                    records: outcome.records.len(),
                    pages: outcome.pages,
                    status,
                    error,
                }
            })
            .collect();
        sites.sort_by(|a, b| a.site_id.cmp(&b.site_id));

        SweepSummary {
            resource: self.resource,
            total: self.progress.total,
            completed: self.progress.completed,
            failed: self.progress.failed,
            records: self.record_count(),
            elapsed_ms: self.elapsed.as_millis() as u64,
            interrupted: self.interrupted,
            sites,
        }
    }

    /// All records from successful sites
    pub fn into_records(self) -> Vec<T> {
        self.outcomes
            .into_iter()
            .flat_map(|outcome| outcome.records)
            .collect()
    }
}

/// Runs per-site tasks for one resource on a bounded pool
pub struct Sweeper {
    source: Arc<dyn PageSource>,
    pool: WorkerPool,
    console: Arc<Console>,
    page_limit: u32,
    site_rows: bool,
}

impl Sweeper {
    pub fn new(source: Arc<dyn PageSource>, workers: usize, page_limit: u32, console: Arc<Console>) -> Self {
        Self {
            source,
            pool: WorkerPool::new(workers),
            console,
            page_limit,
            site_rows: true,
        }
    }

    /// Show or hide the per-site status rows
    pub fn with_site_rows(mut self, site_rows: bool) -> Self {
        self.site_rows = site_rows;
        self
    }

    /// Stop dispatching sites once `cancel` is set
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.pool = self.pool.with_cancel(cancel);
        self
    }

    /// Sweep `R` across `tasks`, waiting for every task that started.
    pub fn run<R: Resource>(&self, tasks: Vec<SiteTask>) -> Result<SweepReport<R::Record>> {
        let start = Instant::now();
        let total = tasks.len();
        let progress = SweepProgress::new(self.console.clone(), R::LABEL, total, self.site_rows);

        tracing::info!(
            "Sweeping {} across {} sites with {} workers",
            R::LABEL,
            total,
            std::cmp::min(self.pool.workers(), total.max(1))
        );

        let outcomes = self
            .pool
            .execute(tasks, |task, worker_id| self.sweep_site::<R>(task, worker_id, &progress))?;

        let outcomes: Vec<SiteOutcome<R::Record>> = outcomes
            .into_iter()
            .map(|outcome| match outcome {
                WorkOutcome::Done(site_outcome) => site_outcome,
                WorkOutcome::Panicked { item, message } => {
                    tracing::error!(
                        "Unexpected failure processing site {} ({}): {}",
                        item.site_id,
                        item.site_name,
                        message
                    );
                    progress.fail_unreported();
                    SiteOutcome::failed(item, 0, format!("unexpected failure: {message}"))
                }
            })
            .collect();

        let interrupted = self.pool.is_cancelled() && outcomes.len() < total;
        if interrupted {
            tracing::warn!(
                "Process interrupted by user (Ctrl+C): {} of {} sites were not processed",
                total - outcomes.len(),
                total
            );
        }

        progress.finish();

        Ok(SweepReport {
            resource: R::LABEL,
            outcomes,
            progress: progress.snapshot(),
            elapsed: start.elapsed(),
            interrupted,
        })
    }

    fn sweep_site<R: Resource>(
        &self,
        task: &SiteTask,
        worker_id: usize,
        progress: &SweepProgress,
    ) -> SiteOutcome<R::Record> {
        tracing::debug!("[worker-{}] site {} ({})", worker_id, task.site_id, task.site_name);

        let row = progress.start_site(&task.site_id, &task.site_name);
        let mut pages = 0;

        let fetched = QueryParams::for_site(&task.site_id, self.page_limit).and_then(|params| {
            fetch_paginated::<R>(self.source.as_ref(), &params, |page| {
                pages = page;
                progress.page_fetched(&row, page);
            })
        });

        match fetched {
            Ok(records) => {
                progress.complete_site(row, records.len(), pages);
                tracing::info!(
                    "Site {} ({}): {} {} in {} pages",
                    task.site_id,
                    task.site_name,
                    records.len(),
                    R::LABEL,
                    pages
                );
                SiteOutcome {
                    task: task.clone(),
                    pages,
                    records,
                    status: TaskStatus::Completed,
                }
            }
            Err(e) => {
                progress.fail_site(row, pages);
                tracing::error!("Error processing site {} ({}): {}", task.site_id, task.site_name, e);
                SiteOutcome::failed(task.clone(), pages, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests;
