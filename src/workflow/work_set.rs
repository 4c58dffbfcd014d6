//! Work-set resolution: which input files still need an output.

use crate::config::ExtensionFilter;
use crate::models::candidate::WorkSet;
use anyhow::{Context, Result};
use log::warn;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::Path;

/// Diff `input_dir` against `output_dir`.
///
/// Both folders are created when missing. The result keeps the order in
/// which the input folder was listed and holds at most `cap` names.
pub fn resolve_work_set(
    input_dir: &Path,
    output_dir: &Path,
    filter: &ExtensionFilter,
    cap: usize,
) -> Result<WorkSet> {
    ensure_dir(input_dir)?;
    ensure_dir(output_dir)?;

    let input = list_names(input_dir)?;
    let output: HashSet<OsString> = list_names(output_dir)?.into_iter().collect();

    let work_set = input
        .into_iter()
        .filter(|name| !output.contains(name))
        .filter_map(|name| match name.into_string() {
            Ok(name) => Some(name),
            Err(raw) => {
                warn!("Skipping non UTF-8 file name {:?}", raw);
                None
            }
        })
        .filter(|name| filter.matches(name))
        .take(cap)
        .collect();

    Ok(work_set)
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create directory tree {:?}", dir))
}

fn list_names(dir: &Path) -> Result<Vec<OsString>> {
    let entries = fs::read_dir(dir).with_context(|| format!("failed to list directory {:?}", dir))?;
    entries
        .map(|entry| {
            entry
                .map(|e| e.file_name())
                .with_context(|| format!("failed to read entry of {:?}", dir))
        })
        .collect()
}
