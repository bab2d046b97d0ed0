//! SentinelOne management API access
//!
//! - [`client`]: authenticated blocking HTTP transport
//! - [`pagination`]: cursor-following list fetches
//! - [`records`]: typed records per endpoint
//!
//! Everything that talks to the network goes through the [`PageSource`]
//! trait, so the runner can be exercised against fixtures.

pub mod client;
pub mod pagination;
pub mod records;

pub use client::SentinelOneClient;
pub use pagination::{QueryParams, fetch_paginated};
pub use records::{Agent, Agents, Alerts, CloudAlert, Resource, Site, Sites, Threat, Threats};

use thiserror::Error;

/// Per-request failures. These fail a single task, never the whole run.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to '{url}' failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to '{url}' timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("'{url}' returned HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("malformed payload from '{endpoint}': {reason}")]
    Malformed { endpoint: String, reason: String },

    #[error("site id is empty")]
    MissingSiteId,
}

impl ApiError {
    pub(crate) fn malformed(endpoint: &str, reason: impl std::fmt::Display) -> Self {
        ApiError::Malformed {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// One GET against a list endpoint, returning the raw JSON envelope
pub trait PageSource: Send + Sync {
    fn get_page(&self, endpoint: &str, query: &[(String, String)]) -> Result<serde_json::Value, ApiError>;
}
