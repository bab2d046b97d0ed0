use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

use super::{ApiError, PageSource};
use crate::config::ApiConfig;

/// Longest response body excerpt carried in a status error
const MAX_ERROR_BODY: usize = 512;

/// Blocking client for the management API. One instance is shared by all workers.
pub struct SentinelOneClient {
    http: Client,
    base_url: String,
    timeout_secs: u64,
}

impl SentinelOneClient {
    /// Build a client with the token baked into the default headers.
    ///
    /// Must not be called (or dropped) from inside an async context: the
    /// blocking client owns its own runtime.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("ApiToken {}", config.token.trim()))
            .context("API token contains characters not allowed in an HTTP header")?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// `<base_url>/<endpoint>` with exactly one slash between them
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Timeouts can surface while sending or while reading the body
    fn transport_error(&self, url: &str, source: reqwest::Error) -> ApiError {
        if source.is_timeout() {
            ApiError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            ApiError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

impl PageSource for SentinelOneClient {
    fn get_page(&self, endpoint: &str, query: &[(String, String)]) -> Result<serde_json::Value, ApiError> {
        let url = self.endpoint_url(endpoint);
        tracing::trace!("GET {} {:?}", url, query);

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .map_err(|source| self.transport_error(&url, source))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
                body.push_str("...");
            }
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().map_err(|source| self.transport_error(&url, source))?;
        serde_json::from_str(&text).map_err(|e| ApiError::malformed(endpoint, e))
    }
}
