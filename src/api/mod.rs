//! High-level, ergonomic library API: process garment photos from bytes or
//! paths, bounded-parallel batch helpers writing into a directory or a
//! storage session. Prefer these entrypoints over the low-level processing
//! modules when integrating garmentprep.
use std::path::{Path, PathBuf};

use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::params::PipelineParams;
use crate::core::processing::pipeline::cutout_and_standardize;
use crate::core::processing::role::{HasRole, dedup_by_role, guess_role};
use crate::core::segmentation::Segmenter;
use crate::error::{Error, Result};
use crate::io::decode::decode_rgba;
use crate::io::storage::{SessionStore, StoredResult};
use crate::io::writers::png::stage_png;
use crate::types::{ProcessedResult, Role, SegmentationSource};

/// Result of in-memory processing of one input.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// Name the input arrived with (upload filename or path)
    pub name: String,
    pub role: Role,
    /// Output filename, `<role>.png`
    pub filename: String,
    pub image: RgbaImage,
    pub source: SegmentationSource,
}

impl ProcessedImage {
    pub fn to_result(&self) -> ProcessedResult {
        ProcessedResult {
            role: self.role,
            filename: self.filename.clone(),
            width: self.image.width(),
            height: self.image.height(),
        }
    }
}

impl HasRole for ProcessedImage {
    fn role(&self) -> Role {
        self.role
    }
}

/// An encoded upload waiting to be processed.
#[derive(Debug, Clone)]
pub struct InputImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(display_name(path), bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub input: String,
    pub message: String,
}

/// Batch processing report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: usize,
    pub errors: usize,
    /// One entry per role, last write wins
    pub results: Vec<ProcessedResult>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    fn fail(&mut self, input: impl Into<String>, err: &Error) {
        let input = input.into();
        warn!("Error processing {}: {}", input, err);
        self.errors += 1;
        self.failures.push(BatchFailure {
            input,
            message: err.to_string(),
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub processed: usize,
    pub errors: usize,
    pub results: Vec<StoredResult>,
    pub failures: Vec<BatchFailure>,
    pub manifest: PathBuf,
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run `f` over `items` on a pool of `workers` threads, keeping input order.
fn run_bounded<T, R, F>(workers: usize, items: &[T], f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(Error::external)?;
    Ok(pool.install(|| items.par_iter().map(&f).collect()))
}

/// Decode, segment, standardize and classify one encoded image.
pub fn process_image_bytes<S: Segmenter + ?Sized>(
    name: &str,
    bytes: &[u8],
    segmenter: &S,
    params: &PipelineParams,
) -> Result<ProcessedImage> {
    let decoded = decode_rgba(name, bytes)?;
    let role = guess_role(name);
    let (image, source) = cutout_and_standardize(&decoded, segmenter, params)?;
    info!(
        "Processed {} as {} ({}x{} -> {}x{}, segmentation: {})",
        name,
        role,
        decoded.width(),
        decoded.height(),
        image.width(),
        image.height(),
        source
    );
    Ok(ProcessedImage {
        name: name.to_string(),
        role,
        filename: role.output_filename(),
        image,
        source,
    })
}

/// Process an image file; its filename decides the role.
pub fn process_image_path<S: Segmenter + ?Sized>(
    path: &Path,
    segmenter: &S,
    params: &PipelineParams,
) -> Result<ProcessedImage> {
    let input = InputImage::from_path(path)?;
    process_image_bytes(&input.name, &input.bytes, segmenter, params)
}

/// Process `inputs` concurrently with at most `params.workers` tasks in flight.
/// The outer `Result` only fails on invalid parameters; per-image failures stay
/// in their own slot and never abort the others. Output order is input order.
///
/// Every standardized canvas is returned in memory. Callers that only need the
/// files should use [`process_paths_to_dir`] or [`process_session`], which
/// write each result as soon as it is ready.
pub fn process_batch<S: Segmenter + ?Sized>(
    inputs: &[InputImage],
    segmenter: &S,
    params: &PipelineParams,
) -> Result<Vec<Result<ProcessedImage>>> {
    params.validate()?;
    info!(
        "Processing batch of {} images with {} workers",
        inputs.len(),
        params.workers
    );
    run_bounded(params.workers, inputs, |input| {
        process_image_bytes(&input.name, &input.bytes, segmenter, params)
    })
}

/// Process image files into `output_dir` as `<role>.png`. Each worker encodes
/// its result to a hidden staging file and drops the canvas; the staged files
/// are then moved into place in input order, so a later input with the same
/// role replaces the earlier file.
pub fn process_paths_to_dir<S: Segmenter + ?Sized>(
    paths: &[PathBuf],
    output_dir: &Path,
    segmenter: &S,
    params: &PipelineParams,
) -> Result<BatchReport> {
    params.validate()?;
    std::fs::create_dir_all(output_dir)?;
    info!(
        "Processing {} files into {:?} with {} workers",
        paths.len(),
        output_dir,
        params.workers
    );

    let outcomes = run_bounded(params.workers, paths, |path| -> Result<_> {
        let processed = process_image_path(path, segmenter, params)?;
        let staged = stage_png(&output_dir.join(&processed.filename), &processed.image)?;
        Ok((staged, processed.to_result()))
    })?;

    let mut report = BatchReport::default();
    let mut written = Vec::new();
    for (path, outcome) in paths.iter().zip(outcomes) {
        let saved = outcome.and_then(|(staged, result)| {
            staged.commit()?;
            Ok(result)
        });
        match saved {
            Ok(result) => {
                report.processed += 1;
                written.push(result);
            }
            Err(e) => report.fail(path.display().to_string(), &e),
        }
    }
    report.results = dedup_by_role(written);

    info!(
        "Batch complete: processed={}, errors={}, outputs={}",
        report.processed,
        report.errors,
        report.results.len()
    );
    Ok(report)
}

/// Upload-handler flow: new session, uploads saved under their role, every
/// image processed and persisted, one manifest describing the deduplicated results.
/// Results are staged by the workers and committed in upload order.
pub fn process_session<S: Segmenter + ?Sized>(
    store: &SessionStore,
    uploads: &[InputImage],
    segmenter: &S,
    params: &PipelineParams,
) -> Result<SessionReport> {
    params.validate()?;
    let session = store.create_session()?;

    let mut failures = Vec::new();
    let mut errors = 0;
    for upload in uploads {
        if let Err(e) = session.save_upload(&upload.name, &upload.bytes) {
            warn!("Could not save upload {}: {}", upload.name, e);
        }
    }

    info!(
        "Processing {} uploads for session {} with {} workers",
        uploads.len(),
        session.id(),
        params.workers
    );
    let outcomes = run_bounded(params.workers, uploads, |upload| -> Result<_> {
        let processed = process_image_bytes(&upload.name, &upload.bytes, segmenter, params)?;
        let staged = session.stage(processed.role, &processed.image)?;
        Ok((staged, processed.to_result()))
    })?;

    let mut processed = 0;
    let mut stored = Vec::new();
    for (upload, outcome) in uploads.iter().zip(outcomes) {
        match outcome.and_then(|(staged, result)| session.commit(staged, result)) {
            Ok(result) => {
                processed += 1;
                stored.push(result);
            }
            Err(e) => {
                warn!("Error processing {}: {}", upload.name, e);
                errors += 1;
                failures.push(BatchFailure {
                    input: upload.name.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    let results = dedup_by_role(stored);
    let manifest = session.write_manifest(&results)?;
    info!(
        "Session {} complete: processed={}, errors={}",
        session.id(),
        processed,
        errors
    );

    Ok(SessionReport {
        session_id: session.id().to_string(),
        processed,
        errors,
        results,
        failures,
        manifest,
    })
}
