//! Setup/initialization module - handles application startup tasks
//!
//! Includes:
//! - Logger initialization (stderr + daily log file)
//! - Folder structure initialization

use crate::common::{LOG_FILE_PREFIX, LOG_FILES_RETAINED};
use crate::config::TransformParams;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use env_logger::{Builder, WriteStyle};
use log::{LevelFilter, kv::Key};
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

// ────────────────────────────────────────────────────────────────
// Folder Initialization
// ────────────────────────────────────────────────────────────────

/// Create the input and output folders if they are missing.
pub fn initialize_folder(params: &TransformParams) -> Result<()> {
    for dir in [&params.input_dir, &params.output_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory tree {:?}", dir))?;
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────
// Daily Log File
// ────────────────────────────────────────────────────────────────

/// Appends to `info-YYYY-MM-DD.log`, switching files when the local date
/// changes and keeping only the most recent files.
pub struct DailyFileWriter {
    dir: PathBuf,
    date: Option<NaiveDate>,
    file: Option<File>,
}

impl DailyFileWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            date: None,
            file: None,
        }
    }

    pub fn file_name(date: NaiveDate) -> String {
        format!("{}{}.log", LOG_FILE_PREFIX, date.format("%Y-%m-%d"))
    }

    fn current_file(&mut self, today: NaiveDate) -> io::Result<&mut File> {
        if self.date != Some(today) || self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.dir.join(Self::file_name(today)))?;
            self.file = Some(file);
            self.date = Some(today);
            prune_log_files(&self.dir, LOG_FILES_RETAINED)?;
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file not open"))
    }
}

impl Write for DailyFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let today = Local::now().date_naive();
        self.current_file(today)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Remove all but the `keep` newest log files in `dir`.
pub fn prune_log_files(dir: &Path, keep: usize) -> io::Result<()> {
    let mut names: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log"))
        .collect();
    // Dates in the names sort chronologically
    names.sort();

    let excess = names.len().saturating_sub(keep);
    for name in &names[..excess] {
        fs::remove_file(dir.join(name))?;
    }
    Ok(())
}

/// A `Write` adapter that copies every log line to stderr and the daily file.
pub struct TeePipe {
    file: DailyFileWriter,
}

impl Write for TeePipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        // log file errors are reported on stderr only
        if let Err(e) = self.file.write_all(buf) {
            let _ = writeln!(io::stderr(), "failed to write log file: {}", e);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        let _ = self.file.flush();
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────
// Logger Initialization
// ────────────────────────────────────────────────────────────────

/// Right-aligned `duration` key-value of a record, blank when absent.
fn format_duration_field(record: &log::Record) -> String {
    let dur_raw = record
        .key_values()
        .get(Key::from("duration"))
        .map(|v| {
            let s = format!("{}", v);
            if let Some(idx) = s.find(|c: char| c.is_alphabetic()) {
                let (num, unit) = (&s[..idx], &s[idx..]);
                if let Ok(val) = num.parse::<f32>() {
                    return format!("{:.2} {}", val, unit);
                }
            }
            s
        })
        .unwrap_or_default();

    format!("{:>10}", dur_raw)
}

/// Install the global logger. Lines go to stderr and to `log_dir`.
pub fn initialize_logger(level: LevelFilter, log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {:?}", log_dir))?;

    Builder::new()
        .write_style(WriteStyle::Never)
        .format(|buf, record| {
            let ts = buf.timestamp();
            let dur = format_duration_field(record);

            writeln!(buf, "{} {:<5} {}", ts, record.level(), record.target())?;

            let message = format!("{}", record.args());
            let subsequent_indent = " ".repeat(11);
            let mut lines = message.lines();

            if let Some(first_line) = lines.next() {
                writeln!(buf, "{} {}", dur, first_line)?;
            }
            for line in lines {
                writeln!(buf, "{}{}", subsequent_indent, line)?;
            }

            Ok(())
        })
        .target(env_logger::Target::Pipe(Box::new(TeePipe {
            file: DailyFileWriter::new(log_dir),
        })))
        .filter(None, level)
        .filter(Some("tokio_cron_scheduler"), LevelFilter::Warn)
        .try_init()
        .context("failed to install logger")?;

    Ok(())
}
