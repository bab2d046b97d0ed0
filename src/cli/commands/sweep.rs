//! `alerts`, `threats` and `agents`: sweep one resource across sites
//!
//! The blocking HTTP client and the worker pool run on a dedicated blocking
//! thread; the async runtime only waits for the report or for Ctrl+C. The
//! first Ctrl+C stops dispatching new sites and keeps the partial results;
//! a second one exits immediately.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::api::{PageSource, Resource, SentinelOneClient};
use crate::cli::{Cli, Output, OutputFormat, SweepArgs};
use crate::config::Settings;
use crate::parallel::{Console, calculate_workers};
use crate::sweep::{
    SiteTask, SweepReport, SweepSummary, Sweeper, discover_sites, select_sites, tasks_from_ids, tasks_from_sites,
};

/// Execute a sweep of resource `R`
pub async fn execute<R: Resource + 'static>(cli: &Cli, args: SweepArgs, output: &Output) -> Result<()> {
    let settings = super::load_settings(cli, Some(&args))?;

    if settings.display.progress && !output.is_quiet() {
        output.console().enable_progress();
    }

    let console = output.console();
    let cancel = Arc::new(AtomicBool::new(false));
    let mut sweep = tokio::task::spawn_blocking({
        let cancel = cancel.clone();
        move || run_sweep::<R>(&settings, console, cancel)
    });

    let joined = tokio::select! {
        joined = &mut sweep => joined,
        Ok(()) = tokio::signal::ctrl_c() => {
            cancel.store(true, Ordering::SeqCst);
            output.warning("Interrupted: finishing sites already running (Ctrl+C again to abort)");
            tokio::select! {
                joined = &mut sweep => joined,
                Ok(()) = tokio::signal::ctrl_c() => {
                    output.error("Aborted");
                    std::process::exit(130);
                }
            }
        }
    };
    let report = joined.context("Sweep thread terminated unexpectedly")??;

    if let Some(path) = &args.output {
        let written = write_records(path, &report)?;
        output.info(&format!("Wrote {} records to {}", written, path.display()));
    }

    let summary = report.summary();
    match args.format {
        OutputFormat::Json => output.data(&serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print_summary(&summary, output),
    }

    if args.strict && summary.failed > 0 {
        bail!("{} of {} sites failed", summary.failed, summary.total);
    }
    if args.strict && summary.interrupted {
        bail!("Sweep was interrupted before every site ran");
    }
    Ok(())
}

fn run_sweep<R: Resource>(
    settings: &Settings,
    console: Arc<Console>,
    cancel: Arc<AtomicBool>,
) -> Result<SweepReport<R::Record>> {
    let source: Arc<dyn PageSource> = Arc::new(SentinelOneClient::new(&settings.api)?);

    let tasks = resolve_tasks(source.as_ref(), settings)?;
    if tasks.is_empty() {
        tracing::warn!("No sites to process");
    }

    let workers = calculate_workers(settings.runner.workers, settings.runner.thread_percentage);
    Sweeper::new(source, workers, settings.api.page_limit, console)
        .with_site_rows(settings.display.site_rows)
        .with_cancel(cancel)
        .run::<R>(tasks)
}

/// Configured site ids, or every discovered site, narrowed by skip/take
pub(crate) fn resolve_tasks(source: &dyn PageSource, settings: &Settings) -> Result<Vec<SiteTask>> {
    let tasks = if settings.sites.ids.is_empty() {
        let sites = discover_sites(source, settings.api.page_limit).context("Failed to list sites")?;
        tracing::info!("Discovered {} sites", sites.len());
        tasks_from_sites(&sites)
    } else {
        tasks_from_ids(&settings.sites.ids)
    };

    Ok(select_sites(tasks, settings.sites.skip, settings.sites.take))
}

fn write_records<T: Serialize>(path: &Path, report: &SweepReport<T>) -> Result<usize> {
    let records: Vec<&T> = report
        .outcomes
        .iter()
        .flat_map(|outcome| outcome.records.iter())
        .collect();

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &records)
        .with_context(|| format!("Failed to write records to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write records to {}", path.display()))?;

    Ok(records.len())
}

fn print_summary(summary: &SweepSummary, output: &Output) {
    output.header(&format!("📊 Sweep Summary ({})", summary.resource));
    output.summary_stats("Sites processed:", summary.total);
    output.summary_stats("Completed:", summary.completed);
    output.summary_stats("Failed:", summary.failed);
    output.summary_stats("Records:", summary.records);
    output.key_value("Elapsed:", &format!("{:.1}s", summary.elapsed_ms as f64 / 1000.0), false);

    for site in &summary.sites {
        output.verbose(&format!(
            "{} ({}): {} records, {} pages, {}",
            site.site_id, site.site_name, site.records, site.pages, site.status
        ));
    }

    let failed: Vec<_> = summary.sites.iter().filter(|site| site.error.is_some()).collect();
    if !failed.is_empty() {
        output.category("Failed sites");
        for site in failed {
            let error = site.error.as_deref().unwrap_or_default();
            output.status_indicator("FAILED", &format!("{} ({}): {}", site.site_id, site.site_name, error), false);
        }
    }

    output.blank_line();
    if summary.interrupted {
        output.warning(&format!(
            "Interrupted: {} of {} sites ran; {} {} were extracted before stopping",
            summary.completed + summary.failed,
            summary.total,
            summary.records,
            summary.resource
        ));
    } else if summary.failed == 0 {
        output.success(&format!("{} {} were extracted", summary.records, summary.resource));
    } else {
        output.warning(&format!(
            "{} {} were extracted; {} of {} sites failed",
            summary.records, summary.resource, summary.failed, summary.total
        ));
    }
}
