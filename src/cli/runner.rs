use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use garmentprep::{
    InputImage, PipelineParams, SessionStore, build_segmenter, process_paths_to_dir,
    process_session,
};

use super::args::CliArgs;
use super::errors::AppError;

fn init_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("garmentprep=info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Config file (if any) first, then flag overrides.
fn load_params(args: &CliArgs) -> Result<PipelineParams, AppError> {
    let mut params = match &args.config {
        Some(path) => {
            info!("Loading parameters from {:?}", path);
            PipelineParams::from_json_file(path)?
        }
        None => PipelineParams::default(),
    };

    if let Some(workers) = args.workers {
        params.workers = workers;
    }
    if let Some(max_size) = args.max_size {
        params.max_size = max_size;
    }
    if let Some(iterations) = args.iterations {
        params.grabcut_iterations = iterations;
    }
    if let Some(side) = args.segmentation_max_side {
        params.segmentation_max_side = (side > 0).then_some(side);
    }
    if let Some(key) = &args.removebg_api_key {
        params.remote.api_key = Some(key.clone());
    }

    params.validate()?;
    Ok(params)
}

fn is_image_file(path: &Path) -> bool {
    path.is_file() && image::ImageFormat::from_path(path).is_ok()
}

fn collect_inputs(args: &CliArgs) -> Result<Vec<PathBuf>, AppError> {
    let mut inputs = args.inputs.clone();

    if let Some(dir) = &args.input_dir {
        let mut found: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if is_image_file(&path) {
                found.push(path);
            } else {
                info!("Skipping non-image entry: {:?}", path);
            }
        }
        if found.is_empty() {
            return Err(AppError::NoInputs { dir: dir.clone() });
        }
        found.sort();
        inputs.extend(found);
    }

    if inputs.is_empty() {
        return Err(AppError::MissingArgument {
            arg: "<INPUTS> or --input-dir".to_string(),
        });
    }
    Ok(inputs)
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log);

    let params = load_params(&args)?;
    let inputs = collect_inputs(&args)?;
    let segmenter = build_segmenter(&params)?;
    if params.remote.has_credential() {
        info!("Remote background removal enabled");
    } else {
        info!("No remote credential, using local segmentation");
    }

    if let Some(data_dir) = &args.data_dir {
        let mut uploads = Vec::with_capacity(inputs.len());
        for path in &inputs {
            match InputImage::from_path(path) {
                Ok(upload) => uploads.push(upload),
                Err(e) => warn!("Skipping {:?}: {}", path, e),
            }
        }

        let store = SessionStore::new(data_dir);
        let report = process_session(&store, &uploads, &segmenter, &params)?;
        info!("Session {} written to {:?}", report.session_id, store.root());
        for stored in &report.results {
            info!("{} -> {}", stored.result.role, stored.url);
        }
        if args.manifest {
            println!("{}", serde_json::to_string_pretty(&report).map_err(AppError::from)?);
        }
        if report.processed == 0 {
            return Err(AppError::NothingProcessed {
                errors: report.errors,
            }
            .into());
        }
    } else {
        let output_dir = args.output_dir.clone().ok_or(AppError::MissingArgument {
            arg: "--output-dir or --data-dir".to_string(),
        })?;
        info!("Output directory: {:?}", output_dir);

        let report = process_paths_to_dir(&inputs, &output_dir, &segmenter, &params)?;
        info!("Processed: {}", report.processed);
        info!("Errors: {}", report.errors);
        if args.manifest {
            println!("{}", serde_json::to_string_pretty(&report).map_err(AppError::from)?);
        }
        if report.processed == 0 {
            return Err(AppError::NothingProcessed {
                errors: report.errors,
            }
            .into());
        }
    }

    Ok(())
}
