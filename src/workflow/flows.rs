use crate::common::errors::handle_error;
use crate::config::TransformParams;
use crate::models::batch::{BatchResult, format_elapsed};
use crate::models::candidate::{Candidate, Outcome};
use crate::workflow::processors::file::{copy_through, is_image_mime, sniff_mime};
use crate::workflow::processors::image::transform;
use crate::workflow::work_set::resolve_work_set;
use anyhow::{Context, Result};
use futures::future::join_all;
use log::{info, warn};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::spawn_blocking;

/// One full resolve → classify → transform → summarize cycle.
///
/// Only failing to create or list the folders is an error; every per-file
/// problem ends up as that file's [`Outcome::Failed`].
pub async fn run_batch(params: Arc<TransformParams>) -> Result<BatchResult> {
    let start_time = Instant::now();
    info!(
        "Batch started: {:?} -> {:?}, watermark {:?}",
        params.input_dir,
        params.output_dir,
        params.watermark.as_ref().map(|w| &w.path)
    );

    let work_set = {
        let params = params.clone();
        spawn_blocking(move || {
            resolve_work_set(
                &params.input_dir,
                &params.output_dir,
                &params.ext_filter,
                params.batch_cap,
            )
        })
        .await
        .context("work set resolver panicked")??
    };
    info!("{} file(s) to process", work_set.len());

    let (names, handles): (Vec<_>, Vec<_>) = work_set
        .into_iter()
        .map(|candidate| {
            let params = params.clone();
            let name = candidate.name.clone();
            (name, spawn_blocking(move || process_candidate(&params, candidate)))
        })
        .unzip();

    let items = join_all(handles)
        .await
        .into_iter()
        .zip(names)
        .map(|(joined, name)| match joined {
            Ok(candidate) => candidate,
            Err(join_error) => {
                let err = handle_error(
                    anyhow::Error::new(join_error).context(format!("{}: worker panicked", name)),
                );
                Candidate {
                    outcome: Outcome::Failed(format!("{:#}", err)),
                    ..Candidate::new(name)
                }
            }
        })
        .collect();

    let result = BatchResult {
        items,
        elapsed: start_time.elapsed(),
    };
    info!(
        duration = &*format!("{:?}", result.elapsed);
        "Batch finished in {}: {} item(s), {}",
        format_elapsed(result.elapsed),
        result.len(),
        result.counts()
    );

    Ok(result)
}

/// Classify one candidate and either copy it through or transform it.
/// Always returns the candidate with a terminal outcome.
pub fn process_candidate(params: &TransformParams, mut candidate: Candidate) -> Candidate {
    let input_path = params.input_path(&candidate.name);
    let output_path = params.output_path(&candidate.name);

    let mime = match sniff_mime(&input_path) {
        Ok(mime) => mime,
        Err(err) => {
            let err = handle_error(err.context(format!("failed to classify {:?}", input_path)));
            candidate.outcome = Outcome::Failed(format!("{:#}", err));
            return candidate;
        }
    };
    candidate.mime = mime;

    if !is_image_mime(mime) {
        warn!(
            "[{:?}][mime type: {}] not an image, copying as-is",
            input_path,
            mime.unwrap_or("unknown")
        );
        candidate.outcome = match copy_through(&input_path, &output_path) {
            Ok(_) => Outcome::Copied,
            Err(err) => Outcome::Failed(format!("{:#}", handle_error(err))),
        };
        return candidate;
    }

    candidate.outcome = match transform(params, &candidate.name) {
        Ok(report) => Outcome::Transformed(report),
        Err(err) => {
            let err = handle_error(err.context(format!("failed to transform {:?}", input_path)));
            Outcome::Failed(format!("{:#}", err))
        }
    };
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtensionFilter;
    use crate::models::candidate::WatermarkStatus;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::fs;
    use std::path::Path;

    fn params(root: &Path, cap: usize) -> TransformParams {
        TransformParams {
            input_dir: root.join("in"),
            output_dir: root.join("out"),
            max_width: 16,
            batch_cap: cap,
            watermark: None,
            ext_filter: ExtensionFilter::default(),
        }
    }

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([10, 200, 30]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_process_candidate_copies_non_images() {
        let root = tempfile::tempdir().unwrap();
        let params = params(root.path(), 10);
        fs::create_dir_all(&params.input_dir).unwrap();
        fs::create_dir_all(&params.output_dir).unwrap();
        fs::write(params.input_path("notes.jpg"), b"plain text in disguise").unwrap();

        let done = process_candidate(&params, Candidate::new("notes.jpg"));

        assert_eq!(done.outcome, Outcome::Copied);
        assert_eq!(done.mime, None);
        assert_eq!(
            fs::read(params.output_path("notes.jpg")).unwrap(),
            b"plain text in disguise"
        );
    }

    #[test]
    fn test_process_candidate_missing_file_fails() {
        let root = tempfile::tempdir().unwrap();
        let params = params(root.path(), 10);

        let done = process_candidate(&params, Candidate::new("ghost.png"));

        assert!(matches!(done.outcome, Outcome::Failed(ref msg) if msg.contains("ghost.png")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_batch_mixed_inputs() {
        let root = tempfile::tempdir().unwrap();
        let params = Arc::new(params(root.path(), 10));
        fs::create_dir_all(&params.input_dir).unwrap();
        write_png(&params.input_path("big.png"), 64, 32);
        write_png(&params.input_path("small.png"), 8, 8);
        fs::write(params.input_path("readme.txt"), b"hello").unwrap();
        fs::write(params.input_path("broken.png"), b"\x89PNG\r\n\x1a\n garbage").unwrap();

        let result = run_batch(params.clone()).await.unwrap();

        assert_eq!(result.len(), 4);
        assert!(result.items.iter().all(|c| c.outcome.is_terminal()));
        let counts = result.counts();
        assert_eq!((counts.transformed, counts.copied, counts.failed), (2, 1, 1));
        assert!(matches!(
            result.outcome_of("big.png"),
            Some(Outcome::Transformed(r)) if r.resized && r.watermark == WatermarkStatus::Disabled
        ));
        assert!(matches!(result.outcome_of("broken.png"), Some(Outcome::Failed(_))));
        assert!(!params.output_path("broken.png").exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_batch_fails_when_input_cannot_be_created() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("in");
        fs::write(&blocker, b"a file where a folder should be").unwrap();

        let result = run_batch(Arc::new(params(root.path(), 10))).await;
        assert!(result.is_err());
    }
}
