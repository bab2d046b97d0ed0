use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

use super::records::Resource;
use super::{ApiError, PageSource};

/// Query parameters sent with every page of a list request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain listing with a page size
    pub fn listing(limit: u32) -> Self {
        Self::new().with("limit", limit.to_string())
    }

    /// Listing scoped to one site. An empty site id is rejected before any request.
    pub fn for_site(site_id: &str, limit: u32) -> Result<Self, ApiError> {
        if site_id.trim().is_empty() {
            return Err(ApiError::MissingSiteId);
        }
        Ok(Self::new().with("siteIds", site_id.trim()).with("limit", limit.to_string()))
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    fn with_cursor(&self, cursor: Option<&str>) -> Vec<(String, String)> {
        let mut pairs = self.pairs.clone();
        if let Some(cursor) = cursor {
            pairs.push(("cursor".to_string(), cursor.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Value,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    #[serde(default)]
    next_cursor: Option<String>,
    #[serde(default)]
    total_items: Option<u64>,
}

/// Fetch every page of `R`, following `pagination.nextCursor` until it runs out.
///
/// `on_page` is called with the running page count after each page.
pub fn fetch_paginated<R: Resource>(
    source: &dyn PageSource,
    params: &QueryParams,
    mut on_page: impl FnMut(usize),
) -> Result<Vec<R::Record>, ApiError> {
    let mut all_records = Vec::new();
    let mut cursor: Option<String> = None;
    let mut seen_cursors: HashSet<String> = HashSet::new();
    let mut page_count = 0;

    let outcome = loop {
        let raw = match source.get_page(R::ENDPOINT, &params.with_cursor(cursor.as_deref())) {
            Ok(raw) => raw,
            Err(e) => break Err(e),
        };

        let envelope: Envelope = match serde_json::from_value(raw) {
            Ok(envelope) => envelope,
            Err(e) => break Err(ApiError::malformed(R::ENDPOINT, e)),
        };

        match R::records(envelope.data) {
            Ok(chunk) => all_records.extend(chunk),
            Err(e) => break Err(ApiError::malformed(R::ENDPOINT, e)),
        }

        page_count += 1;
        on_page(page_count);

        let pagination = envelope.pagination.unwrap_or_default();
        if page_count == 1 {
            if let Some(total) = pagination.total_items {
                tracing::debug!("{} reports {} items", R::ENDPOINT, total);
            }
        }

        match pagination.next_cursor.filter(|next| !next.is_empty()) {
            None => break Ok(()),
            // A cursor handed out twice would loop forever
            Some(next) if !seen_cursors.insert(next.clone()) => {
                break Err(ApiError::malformed(R::ENDPOINT, format!("pagination cursor {next:?} repeated")));
            }
            Some(next) => cursor = Some(next),
        }
    };

    match outcome {
        Ok(()) => {
            tracing::info!(
                "Fetched a total of {} items for endpoint {}",
                all_records.len(),
                R::ENDPOINT
            );
            Ok(all_records)
        }
        Err(e) => {
            tracing::error!("API request failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::records::{Sites, Threats};
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves canned pages in order and records the queries it saw
    struct ScriptedSource {
        pages: Mutex<Vec<Result<Value, ApiError>>>,
        seen: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<Value, ApiError>>) -> Self {
            Self {
                pages: Mutex::new(pages.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn cursors(&self) -> Vec<Option<String>> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|query| query.iter().find(|(k, _)| k == "cursor").map(|(_, v)| v.clone()))
                .collect()
        }
    }

    impl PageSource for ScriptedSource {
        fn get_page(&self, _endpoint: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
            self.seen.lock().unwrap().push(query.to_vec());
            self.pages
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ApiError::malformed("test", "no more pages scripted")))
        }
    }

    fn threat(id: &str) -> Value {
        json!({"id": id, "threatInfo": {"threatName": format!("threat-{id}")}})
    }

    #[test]
    fn test_follows_cursor_until_exhausted() {
        let source = ScriptedSource::new(vec![
            Ok(json!({"data": [threat("1"), threat("2")], "pagination": {"nextCursor": "c1", "totalItems": 5}})),
            Ok(json!({"data": [threat("3"), threat("4")], "pagination": {"nextCursor": "c2"}})),
            Ok(json!({"data": [threat("5")], "pagination": {"nextCursor": null}})),
        ]);
        let mut pages_seen = Vec::new();

        let params = QueryParams::for_site("42", 2).unwrap();
        let threats = fetch_paginated::<Threats>(&source, &params, |n| pages_seen.push(n)).unwrap();

        assert_eq!(threats.len(), 5);
        assert_eq!(threats[4].id, "5");
        assert_eq!(pages_seen, vec![1, 2, 3]);
        assert_eq!(
            source.cursors(),
            vec![None, Some("c1".to_string()), Some("c2".to_string())]
        );
    }

    #[test]
    fn test_single_page_without_pagination_block() {
        let source = ScriptedSource::new(vec![Ok(json!({"data": [threat("1")]}))]);
        let threats = fetch_paginated::<Threats>(&source, &QueryParams::listing(10), |_| {}).unwrap();
        assert_eq!(threats.len(), 1);
    }

    #[test]
    fn test_empty_cursor_ends_pagination() {
        let source = ScriptedSource::new(vec![Ok(json!({"data": [], "pagination": {"nextCursor": ""}}))]);
        let threats = fetch_paginated::<Threats>(&source, &QueryParams::listing(10), |_| {}).unwrap();
        assert!(threats.is_empty());
    }

    #[test]
    fn test_sites_endpoint_reads_nested_data() {
        let source = ScriptedSource::new(vec![Ok(json!({
            "data": {"allSites": {}, "sites": [{"id": "7", "name": "Branch"}]},
            "pagination": {"nextCursor": null}
        }))]);
        let sites = fetch_paginated::<Sites>(&source, &QueryParams::listing(100), |_| {}).unwrap();
        assert_eq!(sites[0].id, "7");
        assert_eq!(sites[0].name, "Branch");
    }

    #[test]
    fn test_error_on_later_page_propagates() {
        let source = ScriptedSource::new(vec![
            Ok(json!({"data": [threat("1")], "pagination": {"nextCursor": "c1"}})),
            Err(ApiError::Status {
                url: "https://s1.example/threats".to_string(),
                status: 500,
                body: "oops".to_string(),
            }),
        ]);
        let err = fetch_paginated::<Threats>(&source, &QueryParams::listing(1), |_| {}).unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
    }

    #[test]
    fn test_missing_data_is_malformed() {
        let source = ScriptedSource::new(vec![Ok(json!({"errors": [{"code": 4010010}]}))]);
        let err = fetch_paginated::<Threats>(&source, &QueryParams::listing(1), |_| {}).unwrap_err();
        assert!(matches!(err, ApiError::Malformed { .. }));
    }

    #[test]
    fn test_repeated_cursor_is_malformed() {
        let source = ScriptedSource::new(vec![
            Ok(json!({"data": [], "pagination": {"nextCursor": "same"}})),
            Ok(json!({"data": [], "pagination": {"nextCursor": "same"}})),
        ]);
        let err = fetch_paginated::<Threats>(&source, &QueryParams::listing(1), |_| {}).unwrap_err();
        assert!(matches!(err, ApiError::Malformed { .. }));
    }

    #[test]
    fn test_cursor_cycle_is_malformed() {
        // A -> B -> A, plus a spare page the loop must never ask for
        let source = ScriptedSource::new(vec![
            Ok(json!({"data": [threat("1")], "pagination": {"nextCursor": "A"}})),
            Ok(json!({"data": [threat("2")], "pagination": {"nextCursor": "B"}})),
            Ok(json!({"data": [threat("3")], "pagination": {"nextCursor": "A"}})),
            Ok(json!({"data": [threat("4")], "pagination": {"nextCursor": null}})),
        ]);

        let err = fetch_paginated::<Threats>(&source, &QueryParams::listing(1), |_| {}).unwrap_err();
        match err {
            ApiError::Malformed { reason, .. } => assert!(reason.contains("repeated"), "{reason}"),
            other => panic!("expected malformed response, got {other:?}"),
        }
        assert_eq!(
            source.cursors(),
            vec![None, Some("A".to_string()), Some("B".to_string())]
        );
    }

    #[test]
    fn test_empty_site_id_is_rejected() {
        assert!(matches!(QueryParams::for_site("  ", 10), Err(ApiError::MissingSiteId)));

        let params = QueryParams::for_site("42", 1000).unwrap();
        assert_eq!(
            params.pairs(),
            &[
                ("siteIds".to_string(), "42".to_string()),
                ("limit".to_string(), "1000".to_string())
            ]
        );
    }
}
