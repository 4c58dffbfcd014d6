//! Image processing module - the per-file transform pipeline
//!
//! Includes:
//! - Image decoding
//! - Downscale to the configured width
//! - Watermark composite
//! - Lossless WebP encoding
//!
//! The resize and watermark stages fail independently: a stage failure is
//! logged and the item moves on to the next stage with whatever image it has.

use crate::{
    common::{LOGO_BLUR_SIGMA, LOGO_MAX_BASE_WIDTH, errors::handle_error},
    config::{TransformParams, Watermark},
    models::candidate::{StageReport, WatermarkStatus},
};
use anyhow::{Context, Result, anyhow, bail};
use image::{
    DynamicImage, ExtendedColorType, codecs::webp::WebPEncoder, imageops, imageops::FilterType,
};
use log::info;
use std::{
    fs::{File, read},
    io::{BufWriter, Write},
    path::Path,
};

// ────────────────────────────────────────────────────────────────
// Public API
// ────────────────────────────────────────────────────────────────

/// Run every stage for `name`.
///
/// Only a source that cannot be decoded is returned as an error; stage
/// failures are logged here and reported through the [`StageReport`].
pub fn transform(params: &TransformParams, name: &str) -> Result<StageReport> {
    let input_path = params.input_path(name);
    let output_path = params.output_path(name);

    let source = decode_image(&input_path)?;
    let source_width = source.width();

    // Resize stage
    info!("{}: resizing", name);
    let resized = resize_to_width(&source, source.width().min(params.max_width));
    let resize_result = encode_webp(&resized, &output_path);
    let resize_ok = stage_succeeded(name, "resize", resize_result);
    let working = if resize_ok { resized } else { source };

    // Watermark stage
    let watermark = match &params.watermark {
        None => WatermarkStatus::Disabled,
        Some(watermark) => {
            info!("{}: applying watermark", name);
            let result = apply_watermark(&working, watermark, source_width)
                .and_then(|marked| encode_webp(&marked, &output_path));
            if stage_succeeded(name, "watermark", result) {
                WatermarkStatus::Applied
            } else {
                WatermarkStatus::Failed
            }
        }
    };

    Ok(StageReport {
        resized: resize_ok,
        watermark,
    })
}

fn stage_succeeded(name: &str, stage: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => {
            info!("{}: {} succeeded", name, stage);
            true
        }
        Err(err) => {
            handle_error(err.context(format!("{}: {} failed", name, stage)));
            false
        }
    }
}

// ────────────────────────────────────────────────────────────────
// DynamicImage Generation
// ────────────────────────────────────────────────────────────────

/// Decode a file by its content; the extension is never consulted.
pub fn decode_image(file_path: &Path) -> Result<DynamicImage> {
    let file_in_memory =
        read(file_path).context(format!("failed to read file into memory: {:?}", file_path))?;

    image::load_from_memory(&file_in_memory)
        .context(format!("failed to decode image: {:?}", file_path))
}

// ────────────────────────────────────────────────────────────────
// Resize
// ────────────────────────────────────────────────────────────────

/// Scale to exactly `width` pixels wide, keeping the aspect ratio.
pub fn resize_to_width(image: &DynamicImage, width: u32) -> DynamicImage {
    if width == image.width() {
        return image.clone();
    }
    let height = scaled_height(image.width(), image.height(), width);
    image.resize_exact(width, height, FilterType::Lanczos3)
}

/// Height matching `new_width` for a `width`×`height` source, rounded, never zero.
pub fn scaled_height(width: u32, height: u32, new_width: u32) -> u32 {
    if width == 0 {
        return height.max(1);
    }
    let scaled = (u64::from(height) * u64::from(new_width) + u64::from(width) / 2) / u64::from(width);
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

// ────────────────────────────────────────────────────────────────
// Watermark
// ────────────────────────────────────────────────────────────────

/// Width of the watermark for a base image `base_width` pixels wide.
pub fn watermark_width(base_width: u32, divisor: u32) -> u32 {
    base_width.min(LOGO_MAX_BASE_WIDTH) / divisor.max(1)
}

/// Composite the watermark onto a copy of `base`.
///
/// The logo is sized from `source_width`, the width of the decoded source
/// before any resize, not from `base`.
pub fn apply_watermark(
    base: &DynamicImage,
    watermark: &Watermark,
    source_width: u32,
) -> Result<DynamicImage> {
    let logo_width = watermark_width(source_width, watermark.divisor);
    if logo_width == 0 {
        bail!(
            "watermark width is zero for a {}px wide source with divisor {}",
            source_width,
            watermark.divisor
        );
    }

    let logo = decode_image(&watermark.path).context("failed to load watermark")?;
    let logo = resize_to_width(&logo, logo_width)
        .blur(LOGO_BLUR_SIGMA)
        .to_rgba8();

    let mut canvas = base.to_rgba8();
    let (x, y) = watermark
        .gravity
        .offset(canvas.dimensions(), logo.dimensions())
        .ok_or_else(|| {
            anyhow!(
                "watermark {}x{} does not fit inside {}x{}",
                logo.width(),
                logo.height(),
                canvas.width(),
                canvas.height()
            )
        })?;
    imageops::overlay(&mut canvas, &logo, x, y);

    Ok(DynamicImage::ImageRgba8(canvas))
}

// ────────────────────────────────────────────────────────────────
// Encoding
// ────────────────────────────────────────────────────────────────

/// Write `image` to `path` as lossless WebP, replacing any existing file.
pub fn encode_webp(image: &DynamicImage, path: &Path) -> Result<()> {
    let rgba = image.to_rgba8();
    let file = File::create(path).context(format!("failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);

    WebPEncoder::new_lossless(&mut writer)
        .encode(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            ExtendedColorType::Rgba8,
        )
        .context(format!("failed to encode WebP to {:?}", path))?;
    writer
        .flush()
        .context(format!("failed to flush {:?}", path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtensionFilter, Gravity};
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::fs;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    fn params(root: &Path, max_width: u32, watermark: Option<Watermark>) -> TransformParams {
        let params = TransformParams {
            input_dir: root.join("in"),
            output_dir: root.join("out"),
            max_width,
            batch_cap: 10,
            watermark,
            ext_filter: ExtensionFilter::default(),
        };
        fs::create_dir_all(&params.input_dir).unwrap();
        fs::create_dir_all(&params.output_dir).unwrap();
        params
    }

    fn write_png(path: &Path, image: &RgbaImage) {
        image.save_with_format(path, ImageFormat::Png).unwrap();
    }

    fn read_output(path: &Path) -> DynamicImage {
        let bytes = fs::read(path).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::WebP);
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_scaled_height_rounds_and_never_hits_zero() {
        assert_eq!(scaled_height(200, 100, 100), 50);
        assert_eq!(scaled_height(300, 100, 100), 33);
        assert_eq!(scaled_height(3, 2, 2), 1);
        assert_eq!(scaled_height(1000, 1, 10), 1);
    }

    #[test]
    fn test_watermark_width_caps_base_at_1024() {
        assert_eq!(watermark_width(500, 10), 50);
        assert_eq!(watermark_width(4000, 10), 102);
        assert_eq!(watermark_width(9, 10), 0);
    }

    #[test]
    fn test_wide_image_is_downscaled() {
        let root = tempfile::tempdir().unwrap();
        let params = params(root.path(), 40, None);
        write_png(&params.input_path("wide.png"), &solid(100, 50, [255, 0, 0, 255]));

        let report = transform(&params, "wide.png").unwrap();

        assert!(report.resized);
        assert_eq!(report.watermark, WatermarkStatus::Disabled);
        let output = read_output(&params.output_path("wide.png"));
        assert_eq!((output.width(), output.height()), (40, 20));
    }

    #[test]
    fn test_narrow_image_is_not_upscaled() {
        let root = tempfile::tempdir().unwrap();
        let params = params(root.path(), 1024, None);
        write_png(&params.input_path("small.png"), &solid(30, 60, [0, 0, 255, 255]));

        transform(&params, "small.png").unwrap();

        let output = read_output(&params.output_path("small.png"));
        assert_eq!((output.width(), output.height()), (30, 60));
    }

    #[test]
    fn test_corrupt_source_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let params = params(root.path(), 100, None);
        let mut bytes = Vec::new();
        solid(10, 10, [1, 2, 3, 255])
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes.truncate(40);
        fs::write(params.input_path("broken.png"), &bytes).unwrap();

        assert!(transform(&params, "broken.png").is_err());
        assert!(!params.output_path("broken.png").exists());
    }

    #[test]
    fn test_watermark_changes_output() {
        let root = tempfile::tempdir().unwrap();
        let logo_path = root.path().join("logo.png");
        write_png(&logo_path, &solid(10, 10, [255, 255, 255, 255]));

        let plain = params(root.path(), 100, None);
        write_png(&plain.input_path("a.png"), &solid(100, 100, [0, 0, 0, 255]));
        transform(&plain, "a.png").unwrap();
        let plain_pixels = read_output(&plain.output_path("a.png")).to_rgba8();
        fs::remove_file(plain.output_path("a.png")).unwrap();

        let marked = TransformParams {
            watermark: Some(Watermark {
                path: logo_path,
                divisor: 4,
                gravity: Gravity::Center,
            }),
            ..plain
        };
        let report = transform(&marked, "a.png").unwrap();

        assert_eq!(report.watermark, WatermarkStatus::Applied);
        let marked_pixels = read_output(&marked.output_path("a.png")).to_rgba8();
        assert_eq!(marked_pixels.dimensions(), plain_pixels.dimensions());
        assert_ne!(marked_pixels, plain_pixels);
        // 25px logo centered on a 100px canvas covers the middle pixel
        assert!(marked_pixels.get_pixel(50, 50)[0] > 200);
        assert_eq!(marked_pixels.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_watermark_failure_keeps_resized_output() {
        let root = tempfile::tempdir().unwrap();
        let logo_path = root.path().join("logo.png");
        fs::write(&logo_path, b"not an image").unwrap();

        let params = params(
            root.path(),
            50,
            Some(Watermark {
                path: logo_path,
                divisor: 2,
                gravity: Gravity::SouthEast,
            }),
        );
        write_png(&params.input_path("a.png"), &solid(100, 40, [9, 9, 9, 255]));

        let report = transform(&params, "a.png").unwrap();

        assert!(report.resized);
        assert_eq!(report.watermark, WatermarkStatus::Failed);
        let output = read_output(&params.output_path("a.png"));
        assert_eq!((output.width(), output.height()), (50, 20));
    }

    #[test]
    fn test_watermark_taller_than_image_does_not_fit() {
        let root = tempfile::tempdir().unwrap();
        let logo_path = root.path().join("logo.png");
        // 1x50 logo scaled to 10px wide becomes 500px tall
        write_png(&logo_path, &solid(1, 50, [255, 255, 255, 255]));
        let watermark = Watermark {
            path: logo_path,
            divisor: 10,
            gravity: Gravity::North,
        };

        let base = DynamicImage::ImageRgba8(solid(100, 100, [0, 0, 0, 255]));
        let err = apply_watermark(&base, &watermark, 100).unwrap_err();
        assert!(err.to_string().contains("does not fit"));
    }

    #[test]
    fn test_watermark_on_tiny_image_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let watermark = Watermark {
            path: root.path().join("never-read.png"),
            divisor: 10,
            gravity: Gravity::Center,
        };
        let base = DynamicImage::ImageRgba8(solid(5, 5, [0, 0, 0, 255]));
        let err = apply_watermark(&base, &watermark, 5).unwrap_err();
        assert!(err.to_string().contains("zero"));
    }

    #[test]
    fn test_resize_failure_still_attempts_watermark() {
        let root = tempfile::tempdir().unwrap();
        let logo_path = root.path().join("logo.png");
        write_png(&logo_path, &solid(4, 4, [255, 255, 255, 255]));
        let params = params(
            root.path(),
            20,
            Some(Watermark {
                path: logo_path,
                divisor: 5,
                gravity: Gravity::Center,
            }),
        );
        write_png(&params.input_path("a.png"), &solid(40, 40, [0, 0, 0, 255]));
        // A directory at the output path makes every write fail
        fs::create_dir_all(params.output_path("a.png")).unwrap();

        let report = transform(&params, "a.png").unwrap();

        assert!(!report.resized);
        assert_eq!(report.watermark, WatermarkStatus::Failed);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_watermark_sized_from_source_width_not_resized_width() {
        let root = tempfile::tempdir().unwrap();
        let logo_path = root.path().join("logo.png");
        write_png(&logo_path, &solid(10, 10, [255, 0, 0, 255]));
        let params = params(
            root.path(),
            500,
            Some(Watermark {
                path: logo_path,
                divisor: 10,
                gravity: Gravity::NorthWest,
            }),
        );
        write_png(&params.input_path("big.png"), &solid(2000, 1000, [0, 0, 0, 255]));

        let report = transform(&params, "big.png").unwrap();

        assert!(report.is_clean());
        let output = read_output(&params.output_path("big.png")).to_rgba8();
        assert_eq!(output.dimensions(), (500, 250));
        // min(2000, 1024) / 10 = 102, not 500 / 10
        let red_cols = (0..output.width())
            .filter(|&x| {
                let px = output.get_pixel(x, 50);
                px[0] > 200 && px[1] < 50
            })
            .count();
        assert_eq!(red_cols, 102);
    }
}
