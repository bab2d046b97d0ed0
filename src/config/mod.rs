//! Configuration management for s1-sweep
//!
//! Connection parameters (API root, token) and runner knobs are read once at
//! startup from layered sources and handed to the commands as a typed
//! [`Settings`] value. Nothing here is global.

mod core;

pub use core::{DEFAULT_CONFIG, SweepConfig};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal configuration problems, reported before any work starts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API token is not set (use --token, S1_API_TOKEN or api.token)")]
    MissingToken,

    #[error("API base URL is not set (use --base-url, S1_BASE_URL or api.base_url)")]
    MissingBaseUrl,

    #[error("API base URL '{0}' must start with http:// or https://")]
    InvalidBaseUrl(String),

    #[error("api.page_limit must be between 1 and 1000, got {0}")]
    InvalidPageLimit(u32),

    #[error("api.timeout_secs cannot be 0")]
    InvalidTimeout,

    #[error("runner.thread_percentage must be between 1 and 100, got {0}")]
    InvalidThreadPercentage(u8),
}

/// Fully merged configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub sites: SitesConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Remote API connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root, endpoint paths are appended to it
    #[serde(default)]
    pub base_url: String,

    /// Sent as `Authorization: ApiToken <token>`
    #[serde(default)]
    pub token: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Records requested per page
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_page_limit() -> u32 {
    1000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
            page_limit: default_page_limit(),
        }
    }
}

/// Worker pool sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Fixed worker count (0 = derive from CPU cores)
    #[serde(default)]
    pub workers: usize,

    /// Percentage of CPU cores used when `workers` is 0
    #[serde(default = "default_thread_percentage")]
    pub thread_percentage: u8,
}

fn default_thread_percentage() -> u8 {
    75
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            thread_percentage: default_thread_percentage(),
        }
    }
}

/// Which sites a sweep covers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitesConfig {
    /// Explicit site ids; when empty the site list is fetched from the API
    #[serde(default)]
    pub ids: Vec<String>,

    /// Sites to skip at the start of the discovered list
    #[serde(default)]
    pub skip: usize,

    /// Sites to take after skipping (0 = all)
    #[serde(default)]
    pub take: usize,
}

/// Console rendering switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Draw the live progress display
    #[serde(default = "default_true")]
    pub progress: bool,

    /// Show one status row per site under the overall bar
    #[serde(default = "default_true")]
    pub site_rows: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            progress: true,
            site_rows: true,
        }
    }
}

impl Settings {
    /// Check everything a sweep needs before touching the network
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url.to_string()));
        }
        if self.api.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if self.api.page_limit == 0 || self.api.page_limit > 1000 {
            return Err(ConfigError::InvalidPageLimit(self.api.page_limit));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.runner.thread_percentage == 0 || self.runner.thread_percentage > 100 {
            return Err(ConfigError::InvalidThreadPercentage(self.runner.thread_percentage));
        }
        Ok(())
    }

    /// Copy safe for display: the token is masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.api.token = mask_token(&self.api.token);
        copy
    }
}

/// Keep the last four characters of a token, mask the rest
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.is_empty() {
        return String::new();
    }
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

#[cfg(test)]
mod tests;
