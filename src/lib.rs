//! voice-gender - Speaker Gender Recognition Library
//!
//! MFCC feature extraction, a pretrained MLP classifier, and spectrogram
//! visualization computed on a background worker.

pub mod audio;
pub mod classifier;
pub mod config;
pub mod dsp;
pub mod error;
pub mod features;
pub mod processing;
pub mod visualization;

pub use classifier::{ClassifierService, Gender, PredictionResult};
pub use config::{Args, Config};
pub use error::{GenderError, Result};
pub use features::{FeatureExtractor, FeatureVector};
pub use processing::{AnalysisSession, AsyncTaskCoordinator, ProgressReporter};
pub use visualization::{VisualizationData, VisualizationPipeline};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Debug level when `verbose`, info otherwise. `RUST_LOG` takes precedence.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init()
        .ok();
}

pub fn get_library_info() -> LibraryInfo {
    LibraryInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl std::fmt::Display for LibraryInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{} - {}", self.name, self.version, self.description)
    }
}
