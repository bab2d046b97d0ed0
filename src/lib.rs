//! # s1-sweep
//!
//! Concurrent per-site extraction from the SentinelOne management API.
//!
//! For one resource (cloud detection alerts, threats or agents) s1-sweep
//! builds one task per site, runs the tasks on a bounded worker pool, follows
//! cursor pagination for each site and reports live progress: an overall bar
//! with percentage and ETA plus a status row per site. A failing site is
//! logged and counted, never fatal to its siblings.
//!
//! ## Quick Start
//!
//! ```bash
//! export S1_BASE_URL=https://usea1-acme.sentinelone.net/web/api/v2.1
//! export S1_API_TOKEN=...
//!
//! # Every site visible to the token
//! s1-sweep alerts -o alerts.json
//!
//! # Two specific sites, JSON summary
//! s1-sweep threats --site 1234 --site 5678 --format json
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod parallel;
pub mod sweep;

pub use cli::{Cli, Output};
pub use config::{Settings, SweepConfig};

/// Result type alias for s1-sweep operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
