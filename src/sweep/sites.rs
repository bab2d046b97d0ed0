use std::collections::HashSet;

use crate::api::{ApiError, PageSource, QueryParams, Site, Sites, fetch_paginated};

use super::SiteTask;

/// Fetch every site visible to the token
pub fn discover_sites(source: &dyn PageSource, page_limit: u32) -> Result<Vec<Site>, ApiError> {
    fetch_paginated::<Sites>(source, &QueryParams::listing(page_limit), |page| {
        tracing::debug!("sites: fetched page {}", page);
    })
}

/// Tasks for explicitly configured site ids (the id doubles as display name)
pub fn tasks_from_ids(ids: &[String]) -> Vec<SiteTask> {
    ids.iter()
        .map(|id| SiteTask::new(id.trim(), id.trim()))
        .collect()
}

/// Tasks for discovered sites
pub fn tasks_from_sites(sites: &[Site]) -> Vec<SiteTask> {
    sites
        .iter()
        .map(|site| SiteTask::new(&site.id, &site.name))
        .collect()
}

/// Drop duplicate site ids (first wins), then apply the skip/take window.
/// `take == 0` keeps everything after `skip`.
pub fn select_sites(tasks: Vec<SiteTask>, skip: usize, take: usize) -> Vec<SiteTask> {
    let mut seen = HashSet::new();
    let unique = tasks
        .into_iter()
        .filter(|task| seen.insert(task.site_id.clone()))
        .skip(skip);

    if take == 0 {
        unique.collect()
    } else {
        unique.take(take).collect()
    }
}
