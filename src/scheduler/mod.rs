//! Cron trigger for batch runs.
//!
//! `tokio-cron-scheduler` fires the job; an [`OverlapGuard`] decides whether a
//! trigger that lands while the previous run is still busy is dropped,
//! queued, or allowed to run alongside it.

mod error;
mod overlap;
mod service;

pub use error::SchedulerError;
pub use overlap::{Acquire, OverlapGuard, OverlapPolicy, RunGuard};
pub use service::{
    SchedulerService, normalize_cron_expression, run_guarded, validate_cron_expression,
};
