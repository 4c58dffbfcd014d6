//! File operations module - content sniffing and pass-through copies

use crate::common::SNIFF_HEADER_BYTES;
use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::Read,
    path::Path,
};

/// MIME type of `path` judged from its leading bytes, or `None` when the
/// bytes are not a format the codec recognises.
pub fn sniff_mime(path: &Path) -> Result<Option<&'static str>> {
    let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;

    let mut header = Vec::with_capacity(SNIFF_HEADER_BYTES);
    file.take(SNIFF_HEADER_BYTES as u64)
        .read_to_end(&mut header)
        .with_context(|| format!("failed to read header of {:?}", path))?;

    Ok(image::guess_format(&header)
        .ok()
        .map(|format| format.to_mime_type()))
}

pub fn is_image_mime(mime: Option<&str>) -> bool {
    mime.is_some_and(|m| m.starts_with("image/"))
}

/// Byte-for-byte copy of a file the pipeline does not transform.
pub fn copy_through(source: &Path, dest: &Path) -> Result<u64> {
    fs::copy(source, dest)
        .with_context(|| format!("failed to copy file from {:?} to {:?}", source, dest))
}
