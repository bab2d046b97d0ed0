//! Worker pool and live console reporting
//!
//! # Architecture Responsibilities
//!
//! This module knows about threads and terminals, not about the API:
//!
//! - [`core`]: a fixed-size pool of OS threads fed by a bounded crossbeam
//!   channel. Every item is processed exactly once, results come back over a
//!   second channel, and a panicking item is reported instead of tearing the
//!   pool down.
//! - [`progress`]: the completed/failed/total counters and the indicatif
//!   overall bar plus per-site rows.
//! - [`console`]: the single serialized sink every line goes through while
//!   the bars are live (styled output and tracing records alike).
//!
//! ```text
//! ┌──────────────┐  items   ┌──────────────┐  outcomes  ┌──────────────┐
//! │   sweep      │────────▶│  WorkerPool  │──────────▶│  collector   │
//! └──────────────┘          └──────┬───────┘            └──────────────┘
//!                                  │ rows, counters, log lines
//!                                  ▼
//!                           ┌──────────────┐
//!                           │   Console    │──▶ stderr
//!                           └──────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use s1_sweep::parallel::{WorkerPool, WorkOutcome};
//!
//! let pool = WorkerPool::new(4);
//! let outcomes = pool.execute(vec![1, 2, 3], |x: &i32, _worker_id| x * 10).unwrap();
//! let mut values: Vec<i32> = outcomes.into_iter().filter_map(WorkOutcome::done).collect();
//! values.sort();
//! assert_eq!(values, vec![10, 20, 30]);
//! ```

pub mod console;
pub mod core;
pub mod progress;

// Re-export main types for easier access
pub use self::console::{Console, LogWriter, SharedBuffer};
pub use self::core::{WorkOutcome, WorkerPool, calculate_workers};
pub use self::progress::{ProgressState, SiteRow, SweepProgress};
