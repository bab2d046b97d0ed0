use super::*;
use crate::api::{Alerts, ApiError, Threats};
use crate::parallel::{Console, SharedBuffer};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fixture-backed API: pages per site id, keyed by the cursor they answer
#[derive(Default)]
struct FixtureSource {
    pages: HashMap<(String, Option<String>), Value>,
    failing_sites: HashMap<String, u16>,
    panicking_sites: Vec<String>,
    cancel_on: Option<(String, Arc<AtomicBool>)>,
    requests: Mutex<Vec<String>>,
}

impl FixtureSource {
    /// Site with `records` alerts spread over pages of `per_page`
    fn with_alert_site(mut self, site_id: &str, records: usize, per_page: usize) -> Self {
        let chunks: Vec<Vec<Value>> = (0..records)
            .map(|n| json!({"alertInfo": {"alertId": format!("{site_id}-{n}")}}))
            .collect::<Vec<_>>()
            .chunks(per_page.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();
        let page_count = chunks.len().max(1);

        for page in 0..page_count {
            let cursor = (page > 0).then(|| format!("{site_id}-c{page}"));
            let next = (page + 1 < page_count).then(|| format!("{site_id}-c{}", page + 1));
            let data = chunks.get(page).cloned().unwrap_or_default();
            self.pages.insert(
                (site_id.to_string(), cursor),
                json!({"data": data, "pagination": {"nextCursor": next}}),
            );
        }
        self
    }

    fn with_failing_site(mut self, site_id: &str, status: u16) -> Self {
        self.failing_sites.insert(site_id.to_string(), status);
        self
    }

    fn with_panicking_site(mut self, site_id: &str) -> Self {
        self.panicking_sites.push(site_id.to_string());
        self
    }

    /// Raise `cancel` while serving `site_id`, as Ctrl+C would mid-sweep
    fn cancelling_at(mut self, site_id: &str, cancel: Arc<AtomicBool>) -> Self {
        self.cancel_on = Some((site_id.to_string(), cancel));
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl PageSource for FixtureSource {
    fn get_page(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        let lookup = |key: &str| query.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        let site_id = lookup("siteIds").unwrap_or_default();
        self.requests.lock().unwrap().push(site_id.clone());

        if let Some((cancel_site, cancel)) = &self.cancel_on {
            if *cancel_site == site_id {
                cancel.store(true, Ordering::SeqCst);
            }
        }
        if self.panicking_sites.contains(&site_id) {
            panic!("fixture panic for site {site_id}");
        }
        if let Some(status) = self.failing_sites.get(&site_id) {
            return Err(ApiError::Status {
                url: format!("https://s1.example/{endpoint}"),
                status: *status,
                body: "fixture failure".to_string(),
            });
        }

        self.pages
            .get(&(site_id.clone(), lookup("cursor")))
            .cloned()
            .ok_or_else(|| ApiError::malformed(endpoint, format!("no fixture for site {site_id}")))
    }
}

fn sweeper(source: FixtureSource, workers: usize) -> (Sweeper, Arc<FixtureSource>, SharedBuffer) {
    let (console, buffer) = Console::buffered();
    let source = Arc::new(source);
    let sweeper = Sweeper::new(source.clone(), workers, 2, Arc::new(console));
    (sweeper, source, buffer)
}

fn site_tasks(ids: &[&str]) -> Vec<SiteTask> {
    ids.iter().map(|id| SiteTask::new(id, &format!("Site {id}"))).collect()
}

#[test]
fn test_counts_match_fixture_split() {
    let source = FixtureSource::default()
        .with_alert_site("1", 5, 2)
        .with_alert_site("2", 0, 2)
        .with_alert_site("3", 3, 2)
        .with_failing_site("4", 500)
        .with_failing_site("5", 403);
    let (sweeper, _source, _buffer) = sweeper(source, 3);

    let report = sweeper.run::<Alerts>(site_tasks(&["1", "2", "3", "4", "5"])).unwrap();

    assert_eq!(report.progress.total, 5);
    assert_eq!(report.progress.completed, 3);
    assert_eq!(report.progress.failed, 2);
    assert_eq!(report.outcomes.len(), 5);
    assert_eq!(report.record_count(), 8);

    let summary = report.summary();
    let per_site: Vec<(&str, usize, usize, &str)> = summary
        .sites
        .iter()
        .map(|site| (site.site_id.as_str(), site.records, site.pages, site.status))
        .collect();
    assert_eq!(
        per_site,
        vec![
            ("1", 5, 3, "completed"),
            ("2", 0, 1, "completed"),
            ("3", 3, 2, "completed"),
            ("4", 0, 0, "failed"),
            ("5", 0, 0, "failed"),
        ]
    );
    assert!(summary.sites[3].error.as_deref().unwrap().contains("500"));
}

#[test]
fn test_every_task_is_accounted_for() {
    let mut source = FixtureSource::default();
    let ids: Vec<String> = (0..40).map(|n| n.to_string()).collect();
    for (n, id) in ids.iter().enumerate() {
        source = if n % 7 == 0 {
            source.with_failing_site(id, 502)
        } else {
            source.with_alert_site(id, n % 4, 1)
        };
    }
    let (sweeper, _source, _buffer) = sweeper(source, 6);

    let tasks: Vec<SiteTask> = ids.iter().map(|id| SiteTask::new(id, id)).collect();
    let report = sweeper.run::<Alerts>(tasks).unwrap();

    assert_eq!(report.progress.completed + report.progress.failed, 40);
    assert_eq!(report.progress.failed, 6);
    assert_eq!(report.outcomes.len(), 40);

    let mut seen: Vec<&str> = report.outcomes.iter().map(|o| o.task.site_id.as_str()).collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 40);
}

#[test]
fn test_failure_does_not_affect_siblings() {
    let source = FixtureSource::default()
        .with_failing_site("bad", 500)
        .with_alert_site("good-1", 4, 2)
        .with_alert_site("good-2", 1, 2);
    let (sweeper, _source, _buffer) = sweeper(source, 1);

    let report = sweeper.run::<Alerts>(site_tasks(&["bad", "good-1", "good-2"])).unwrap();

    assert_eq!(report.failed(), 1);
    let records = report.into_records();
    assert_eq!(records.len(), 5);
    assert!(records.iter().all(|alert| alert.alert_info.alert_id.starts_with("good")));
}

#[test]
fn test_panicking_task_is_recorded_as_failed() {
    let source = FixtureSource::default()
        .with_panicking_site("boom")
        .with_alert_site("ok", 2, 5);
    let (sweeper, _source, _buffer) = sweeper(source, 2);

    let report = sweeper.run::<Alerts>(site_tasks(&["boom", "ok"])).unwrap();

    assert_eq!(report.progress.completed, 1);
    assert_eq!(report.progress.failed, 1);
    let failed = report.outcomes.iter().find(|o| o.task.site_id == "boom").unwrap();
    match &failed.status {
        TaskStatus::Failed { error } => assert!(error.contains("fixture panic")),
        TaskStatus::Completed => panic!("panicking site should be failed"),
    }
}

#[test]
fn test_empty_site_id_fails_without_request() {
    let source = FixtureSource::default();
    let (sweeper, source, _buffer) = sweeper(source, 2);

    let report = sweeper.run::<Threats>(vec![SiteTask::new("", "unnamed")]).unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(source.request_count(), 0);
}

#[test]
fn test_no_tasks() {
    let (sweeper, _source, _buffer) = sweeper(FixtureSource::default(), 4);
    let report = sweeper.run::<Alerts>(Vec::new()).unwrap();
    assert_eq!(report.progress, ProgressState::new(0));
    assert!(report.outcomes.is_empty());
}

#[test]
fn test_cancelled_sweep_reports_finished_sites_only() {
    let cancel = Arc::new(AtomicBool::new(false));
    let mut source = FixtureSource::default();
    for id in ["1", "2", "3", "4", "5"] {
        source = source.with_alert_site(id, 3, 2);
    }
    let source = source.cancelling_at("2", cancel.clone());
    let (sweeper, source, _buffer) = sweeper(source, 1);
    let sweeper = sweeper.with_cancel(cancel);

    let report = sweeper.run::<Alerts>(site_tasks(&["1", "2", "3", "4", "5"])).unwrap();

    assert!(report.interrupted);
    assert_eq!(report.progress.total, 5);
    assert_eq!(report.progress.completed, 2);
    assert_eq!(report.progress.failed, 0);

    // The site in flight when cancelled still finishes every page
    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.task.site_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(report.record_count(), 6);
    assert_eq!(source.request_count(), 4);
    assert!(report.summary().interrupted);
}

#[test]
fn test_uncancelled_sweep_is_not_interrupted() {
    let source = FixtureSource::default().with_alert_site("1", 1, 1);
    let (sweeper, _source, _buffer) = sweeper(source, 2);
    let sweeper = sweeper.with_cancel(Arc::new(AtomicBool::new(false)));

    let report = sweeper.run::<Alerts>(site_tasks(&["1"])).unwrap();
    assert!(!report.interrupted);
}

#[test]
fn test_summary_serializes() {
    let source = FixtureSource::default().with_alert_site("9", 1, 1).with_failing_site("8", 404);
    let (sweeper, _source, _buffer) = sweeper(source, 2);
    let report = sweeper.run::<Alerts>(site_tasks(&["9", "8"])).unwrap();

    let value = serde_json::to_value(report.summary()).unwrap();
    assert_eq!(value["resource"], "alerts");
    assert_eq!(value["completed"], 1);
    assert_eq!(value["failed"], 1);
    assert!(value["sites"][0].get("error").is_some());
    assert!(value["sites"][1].get("error").is_none());
}
