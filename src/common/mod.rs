pub mod errors;

pub const DEFAULT_INPUT_PATH: &str = "./files/input";

pub const DEFAULT_OUTPUT_PATH: &str = "./files/output";

pub const DEFAULT_RESIZE_WIDTH: u32 = 1024;

pub const DEFAULT_RESIZE_COUNT: usize = 100;

pub const DEFAULT_LOGO_SIZE: u32 = 10;

pub const DEFAULT_LOG_PATH: &str = "./logs";

/// The watermark is sized against at most this many pixels of base width.
pub const LOGO_MAX_BASE_WIDTH: u32 = 1024;

pub const LOGO_BLUR_SIGMA: f32 = 0.3;

/// Enough leading bytes for every signature the codec can recognise.
pub const SNIFF_HEADER_BYTES: usize = 4096;

pub const LOG_FILE_PREFIX: &str = "info-";

pub const LOG_FILES_RETAINED: usize = 30;
