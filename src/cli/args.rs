use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "garmentprep",
    version,
    about = "Remove garment photo backgrounds and standardize them onto transparent square canvases"
)]
pub struct CliArgs {
    /// Input image files (role is guessed from each filename)
    pub inputs: Vec<PathBuf>,

    /// Directory whose image files are all processed
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Output directory receiving front.png / back.png / side.png (directory mode)
    #[arg(short, long, conflicts_with = "data_dir")]
    pub output_dir: Option<PathBuf>,

    /// Data root for session storage (session mode)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// JSON file with pipeline parameters; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Concurrent image-processing tasks (1-64)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Output side length in pixels
    #[arg(long)]
    pub max_size: Option<u32>,

    /// GrabCut refinement iterations
    #[arg(long)]
    pub iterations: Option<usize>,

    /// Long side cap of the local segmentation working copy; 0 runs at full resolution
    #[arg(long)]
    pub segmentation_max_side: Option<u32>,

    /// remove.bg API key; without one only local segmentation runs
    #[arg(long, env = "REMOVEBG_API_KEY", hide_env_values = true)]
    pub removebg_api_key: Option<String>,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,

    /// Print the JSON report to stdout
    #[arg(long, default_value_t = false)]
    pub manifest: bool,
}
