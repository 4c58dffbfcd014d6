//! Scheduled batch resizer.
//!
//! Every cron tick the input folder is diffed against the output folder, and
//! each file that has not been produced yet is either copied through (when it
//! is not an image) or downscaled, optionally watermarked, and re-encoded as
//! lossless WebP under its original name.

pub mod common;
pub mod config;
pub mod models;
pub mod scheduler;
pub mod workflow;

pub use config::{AppConfig, TransformParams};
pub use models::batch::BatchResult;
pub use workflow::flows::run_batch;
