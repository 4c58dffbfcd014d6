//! Process configuration.
//!
//! Everything is read once from the environment (optionally seeded from a
//! `.env` file) into [`AppConfig`], then validated into the immutable
//! [`TransformParams`] that every batch run shares.

mod gravity;
mod params;

pub use gravity::{Gravity, UnknownGravity};
pub use params::{ExtensionFilter, TransformParams, Watermark};

use crate::common::{
    DEFAULT_INPUT_PATH, DEFAULT_LOG_PATH, DEFAULT_LOGO_SIZE, DEFAULT_OUTPUT_PATH,
    DEFAULT_RESIZE_COUNT, DEFAULT_RESIZE_WIDTH,
};
use crate::scheduler::OverlapPolicy;
use dotenv::dotenv;
use log::LevelFilter;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },

    #[error("EXT_REGEX `{pattern}` is not a valid regular expression: {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("LOGO_GRAVITY: {0}")]
    InvalidGravity(#[from] UnknownGravity),

    #[error("OVERLAP_POLICY `{0}` is not one of skip, queue, concurrent")]
    InvalidOverlapPolicy(String),

    #[error("LOG_LEVEL `{0}` is not a valid log level")]
    InvalidLogLevel(String),

    #[error("CRONTAB is required to schedule batch runs")]
    MissingCrontab,
}

/// Raw configuration as it appears in the environment.
///
/// Field names map to upper-case variables (`input_path` → `INPUT_PATH`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    #[serde(default = "default_resize_width")]
    pub resize_width: u32,
    #[serde(default = "default_resize_count")]
    pub resize_count: usize,
    #[serde(default)]
    pub logo_path: Option<PathBuf>,
    #[serde(default = "default_logo_size")]
    pub logo_size: u32,
    #[serde(default = "default_logo_gravity")]
    pub logo_gravity: String,
    #[serde(default)]
    pub ext_regex: Option<String>,
    #[serde(default)]
    pub crontab: Option<String>,
    #[serde(default = "default_overlap_policy")]
    pub overlap_policy: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
}

fn default_input_path() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_PATH)
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

fn default_resize_width() -> u32 {
    DEFAULT_RESIZE_WIDTH
}

fn default_resize_count() -> usize {
    DEFAULT_RESIZE_COUNT
}

fn default_logo_size() -> u32 {
    DEFAULT_LOGO_SIZE
}

fn default_logo_gravity() -> String {
    "center".to_string()
}

fn default_overlap_policy() -> String {
    "skip".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_PATH)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_path: default_output_path(),
            resize_width: default_resize_width(),
            resize_count: default_resize_count(),
            logo_path: None,
            logo_size: default_logo_size(),
            logo_gravity: default_logo_gravity(),
            ext_regex: None,
            crontab: None,
            overlap_policy: default_overlap_policy(),
            log_level: default_log_level(),
            log_path: default_log_path(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Ok(envy::from_env::<AppConfig>()?)
    }

    /// Load from an explicit set of `KEY=value` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter::<_, AppConfig>(vars)?)
    }

    pub fn crontab(&self) -> Result<&str, ConfigError> {
        self.crontab
            .as_deref()
            .map(str::trim)
            .filter(|expr| !expr.is_empty())
            .ok_or(ConfigError::MissingCrontab)
    }

    pub fn overlap_policy(&self) -> Result<OverlapPolicy, ConfigError> {
        self.overlap_policy
            .parse()
            .map_err(|_| ConfigError::InvalidOverlapPolicy(self.overlap_policy.clone()))
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}
