//! Configuration management for feature extraction, classification and visualization

use crate::error::{GenderError, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub features: FeatureConfig,
    pub visualization: VisualizationConfig,
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
}

/// MFCC parameters. The trained classifier depends on every one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub sample_rate: u32,
    pub max_duration_secs: f32,
    pub n_mfcc: usize,
    pub n_mels: usize,
    pub n_fft: usize,
    pub hop_length: usize,
    pub top_db: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub sample_rate: u32,
    pub max_duration_secs: f32,
    pub n_fft: usize,
    pub hop_length: usize,
    pub top_db: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub verbose: bool,
    pub extraction_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/gender_model.json"),
            scaler_path: PathBuf::from("./models/scaler.json"),
        }
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            max_duration_secs: 3.0,
            n_mfcc: 40,
            n_mels: 128,
            n_fft: 2048,
            hop_length: 512,
            top_db: 80.0,
        }
    }
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            max_duration_secs: 10.0,
            n_fft: 2048,
            hop_length: 512,
            top_db: 80.0,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            extraction_threads: num_cpus::get().min(4),
        }
    }
}

impl Config {
    pub fn model_path(&self) -> &PathBuf {
        &self.model.model_path
    }

    pub fn scaler_path(&self) -> &PathBuf {
        &self.model.scaler_path
    }

    pub fn verbose(&self) -> bool {
        self.processing.verbose
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "voicegender", about = "Speaker gender recognition and spectrum analysis", version, author)]
pub struct Args {
    #[arg(short = 'i', long = "input", help = "Input audio file path (WAV or MP3)")]
    pub input: Option<PathBuf>,

    #[arg(short = 'm', long = "model", help = "Classifier artifact path (JSON)")]
    pub model: Option<PathBuf>,

    #[arg(short = 's', long = "scaler", help = "Scaler artifact path (JSON)")]
    pub scaler: Option<PathBuf>,

    #[arg(short = 'c', long = "config", help = "Config file path (TOML format)")]
    pub config_file: Option<PathBuf>,

    #[arg(long = "visualize", help = "Compute waveform and spectrogram on the background worker")]
    pub visualize: bool,

    #[arg(long = "export-visualization", help = "Write visualization data as JSON to this path")]
    pub export_visualization: Option<PathBuf>,

    #[arg(long = "threads", help = "Thread count for batch feature extraction")]
    pub threads: Option<usize>,

    #[arg(short = 'v', long = "verbose", help = "Enable verbose output mode")]
    pub verbose: bool,

    #[arg(long = "test-only", help = "Validate configuration only, do not process audio")]
    pub test_only: bool,
}

impl Config {
    /// Create config from command line arguments
    pub fn from_args() -> Result<Self> {
        let args = Args::parse();
        Self::from_args_and_config(&args)
    }

    /// Create config from command line arguments and config file
    pub fn from_args_and_config(args: &Args) -> Result<Self> {
        let mut config = if let Some(config_path) = &args.config_file {
            Self::from_file(config_path)?
        } else {
            Self::default()
        };

        // Command line arguments override config file settings
        if let Some(model) = &args.model {
            config.model.model_path = model.clone();
        }
        if let Some(scaler) = &args.scaler {
            config.model.scaler_path = scaler.clone();
        }
        if let Some(threads) = args.threads {
            config.processing.extraction_threads = threads;
        }
        config.processing.verbose |= args.verbose;

        config.validate()?;

        Ok(config)
    }

    /// Load config from TOML config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GenderError::config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| GenderError::config(format!("Failed to parse config file: {}", e)))
    }

    /// Validate configuration parameter validity
    pub fn validate(&self) -> Result<()> {
        let f = &self.features;
        validate_rate(f.sample_rate)?;
        validate_window(f.n_fft, f.hop_length)?;
        if f.max_duration_secs <= 0.0 || !f.max_duration_secs.is_finite() {
            return Err(GenderError::config("Feature duration cap must be greater than 0"));
        }
        if f.n_mels == 0 || f.n_mfcc == 0 {
            return Err(GenderError::config("Mel band and MFCC counts must be greater than 0"));
        }
        if f.n_mfcc > f.n_mels {
            return Err(GenderError::config("MFCC count cannot exceed mel band count"));
        }
        if f.top_db <= 0.0 {
            return Err(GenderError::config("top_db must be greater than 0"));
        }

        let v = &self.visualization;
        validate_rate(v.sample_rate)?;
        validate_window(v.n_fft, v.hop_length)?;
        if v.max_duration_secs <= 0.0 || !v.max_duration_secs.is_finite() {
            return Err(GenderError::config("Visualization duration cap must be greater than 0"));
        }
        if v.top_db <= 0.0 {
            return Err(GenderError::config("top_db must be greater than 0"));
        }

        if self.processing.extraction_threads == 0 {
            return Err(GenderError::config("Extraction thread count must be greater than 0"));
        }
        if self.processing.extraction_threads > num_cpus::get() * 2 {
            return Err(GenderError::config("Extraction thread count cannot exceed 2x logical CPU cores"));
        }

        Ok(())
    }

    /// Save config to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GenderError::config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| GenderError::config(format!("Failed to write config file: {}", e)))
    }
}

fn validate_rate(sample_rate: u32) -> Result<()> {
    if sample_rate == 0 {
        return Err(GenderError::config("Sample rate must be greater than 0"));
    }
    if sample_rate > 192000 {
        return Err(GenderError::config("Sample rate cannot exceed 192000 Hz"));
    }
    Ok(())
}

fn validate_window(n_fft: usize, hop_length: usize) -> Result<()> {
    if n_fft < 2 {
        return Err(GenderError::config("FFT size must be at least 2"));
    }
    if hop_length == 0 {
        return Err(GenderError::config("Hop length must be greater than 0"));
    }
    if hop_length > n_fft {
        return Err(GenderError::config("Hop length cannot exceed FFT size"));
    }
    Ok(())
}
