//! Training-side feature extraction
//!
//! Walks `<data-dir>/female` and `<data-dir>/male`, extracts one MFCC vector
//! per clip with the exact inference recipe, and writes a JSON dataset.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use voicegender::classifier::ScalerState;
use voicegender::config::Config;
use voicegender::features::{FeatureDataset, FeatureExtractor, LabeledFolder};
use voicegender::init_logging;

#[derive(Parser, Debug)]
#[command(name = "extract_features")]
#[command(about = "Extract labeled MFCC features for classifier training")]
struct Args {
    /// Folder holding `female/` and `male/` subfolders
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Dataset output path (JSON)
    #[arg(short, long, default_value = "models/features.json")]
    output: PathBuf,

    /// Also fit a scaler on the dataset and write it here
    #[arg(long)]
    fit_scaler: Option<PathBuf>,

    /// Config file (TOML) with feature parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads for extraction
    #[arg(short, long)]
    threads: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(threads) = args.threads {
        config.processing.extraction_threads = threads;
    }
    config.validate()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.processing.extraction_threads)
        .build()
        .context("Failed to build extraction thread pool")?;

    let extractor = FeatureExtractor::new(config.features.clone())?;
    let folders = [
        LabeledFolder::new(args.data_dir.join("female"), 0),
        LabeledFolder::new(args.data_dir.join("male"), 1),
    ];

    println!("=== Feature Extraction ===");
    println!("Data: {}", args.data_dir.display());
    println!("Threads: {}", config.processing.extraction_threads);
    println!("==========================\n");

    let dataset = pool.install(|| FeatureDataset::collect(&extractor, &folders));

    let female = dataset.count_label(0);
    let male = dataset.count_label(1);
    println!("Extracted {} clips ({} female, {} male)", dataset.len(), female, male);
    if female == 0 || male == 0 {
        bail!("Not enough audio files: both classes need at least one clip");
    }

    dataset
        .save_to_file(&args.output)
        .with_context(|| format!("Writing dataset to {}", args.output.display()))?;
    println!("Dataset written to {} ({} x {})", args.output.display(), dataset.len(), extractor.dimension());

    if let Some(scaler_path) = &args.fit_scaler {
        let scaler = ScalerState::fit(&dataset.features)?;
        if let Some(parent) = scaler_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        scaler
            .save_to_file(scaler_path)
            .with_context(|| format!("Writing scaler to {}", scaler_path.display()))?;
        println!("Scaler written to {}", scaler_path.display());
    }

    Ok(())
}
