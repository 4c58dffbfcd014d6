use super::{AppConfig, ConfigError, Gravity};
use log::{info, warn};
use path_clean::PathClean;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Watermark settings, present only when the asset existed at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watermark {
    pub path: PathBuf,
    pub divisor: u32,
    pub gravity: Gravity,
}

/// User supplied pattern tested against bare file names.
#[derive(Debug, Clone, Default)]
pub struct ExtensionFilter(Option<Regex>);

impl ExtensionFilter {
    pub fn new(pattern: Option<&str>) -> Result<Self, ConfigError> {
        match pattern {
            None => Ok(Self(None)),
            Some(pattern) => Regex::new(pattern)
                .map(|regex| Self(Some(regex)))
                .map_err(|source| ConfigError::InvalidRegex {
                    pattern: pattern.to_string(),
                    source,
                }),
        }
    }

    /// An absent pattern accepts every name.
    pub fn matches(&self, name: &str) -> bool {
        self.0.as_ref().is_none_or(|regex| regex.is_match(name))
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_ref().map(Regex::as_str)
    }
}

/// Immutable settings shared by every item of every batch run.
#[derive(Debug, Clone)]
pub struct TransformParams {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub max_width: u32,
    pub batch_cap: usize,
    pub watermark: Option<Watermark>,
    pub ext_filter: ExtensionFilter,
}

impl TransformParams {
    /// Validate `config`. A missing watermark asset disables watermarking for
    /// the whole process and is reported here, once.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        if config.resize_width == 0 {
            return Err(ConfigError::Zero { key: "RESIZE_WIDTH" });
        }
        if config.resize_count == 0 {
            return Err(ConfigError::Zero { key: "RESIZE_COUNT" });
        }
        if config.logo_size == 0 {
            return Err(ConfigError::Zero { key: "LOGO_SIZE" });
        }

        let gravity: Gravity = config.logo_gravity.parse()?;
        let ext_filter = ExtensionFilter::new(config.ext_regex.as_deref())?;
        let watermark = resolve_watermark(config.logo_path.as_deref(), config.logo_size, gravity);

        Ok(Self {
            input_dir: config.input_path.clean(),
            output_dir: config.output_path.clean(),
            max_width: config.resize_width,
            batch_cap: config.resize_count,
            watermark,
            ext_filter,
        })
    }

    pub fn input_path(&self, name: &str) -> PathBuf {
        self.input_dir.join(name)
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

fn resolve_watermark(logo_path: Option<&Path>, divisor: u32, gravity: Gravity) -> Option<Watermark> {
    let path = logo_path.filter(|p| !p.as_os_str().is_empty());
    match path {
        Some(path) if path.is_file() => {
            info!("Watermark {:?} enabled at {}", path, gravity);
            Some(Watermark {
                path: path.clean(),
                divisor,
                gravity,
            })
        }
        Some(path) => {
            warn!("Watermark file {:?} not found, watermarking disabled", path);
            None
        }
        None => {
            warn!("LOGO_PATH not set, watermarking disabled");
            None
        }
    }
}
