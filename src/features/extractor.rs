//! Time-averaged MFCC extraction

use std::path::{Path, PathBuf};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::audio::{load_audio, AudioSignal, LoadOptions};
use crate::config::FeatureConfig;
use crate::dsp::{dct_ortho_basis, power_to_db, MelFilterbank, Stft};
use crate::error::{GenderError, Result};

const POWER_AMIN: f32 = 1e-10;

/// One mean MFCC value per coefficient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn view(&self) -> ArrayView1<'_, f32> {
        ArrayView1::from(&self.0[..])
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

impl From<Array1<f32>> for FeatureVector {
    fn from(values: Array1<f32>) -> Self {
        Self(values.to_vec())
    }
}

/// Turns audio files into fixed-length MFCC vectors.
///
/// Every parameter in [`FeatureConfig`] is part of the contract with the
/// trained classifier; changing any of them invalidates the model.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
    stft: Stft,
    mel: MelFilterbank,
    dct: Array2<f32>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Result<Self> {
        if config.sample_rate == 0 || config.n_fft < 2 || config.hop_length == 0 {
            return Err(GenderError::config("Invalid STFT parameters for feature extraction"));
        }
        if config.n_mfcc == 0 || config.n_mfcc > config.n_mels {
            return Err(GenderError::config(format!(
                "MFCC count {} must be in 1..={}", config.n_mfcc, config.n_mels
            )));
        }

        let stft = Stft::new(config.n_fft, config.hop_length);
        let mel = MelFilterbank::full_band(config.sample_rate, config.n_fft, config.n_mels);
        let dct = dct_ortho_basis(config.n_mfcc, config.n_mels);

        log::debug!(
            "FeatureExtractor initialized: sr={}, n_mfcc={}, n_mels={}, n_fft={}, hop={}",
            config.sample_rate, config.n_mfcc, config.n_mels, config.n_fft, config.hop_length
        );

        Ok(Self { config, stft, mel, dct })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Length of every vector this extractor produces.
    pub fn dimension(&self) -> usize {
        self.config.n_mfcc
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions::new(self.config.sample_rate, self.config.max_duration_secs)
    }

    /// Decode `path` and reduce it to a feature vector.
    pub fn extract(&self, path: &Path) -> Result<FeatureVector> {
        let signal = load_audio(path, &self.load_options())?;
        self.extract_signal(&signal)
    }

    /// Features of an already decoded signal at the configured sample rate.
    pub fn extract_signal(&self, signal: &AudioSignal) -> Result<FeatureVector> {
        if signal.sample_rate() != self.config.sample_rate {
            return Err(GenderError::processing(format!(
                "Sample rate mismatch: {} vs {}", signal.sample_rate(), self.config.sample_rate
            )));
        }
        if signal.is_empty() {
            return Err(GenderError::processing("Cannot extract features from an empty signal"));
        }

        let mfcc = self.mfcc(signal.as_slice());
        let mean = mfcc
            .mean_axis(Axis(1))
            .ok_or_else(|| GenderError::processing("MFCC matrix has no frames"))?;

        if mean.iter().any(|v| !v.is_finite()) {
            return Err(GenderError::processing("Feature vector contains non-finite values"));
        }

        Ok(FeatureVector::from(mean))
    }

    /// Per-frame MFCC matrix, shape (n_mfcc, frames).
    pub fn mfcc(&self, samples: &[f32]) -> Array2<f32> {
        let power = self.stft.power(samples);
        let mel = self.mel.apply(&power);
        let log_mel = power_to_db(&mel, 1.0, POWER_AMIN, Some(self.config.top_db));
        self.dct.dot(&log_mel)
    }

    /// Extract many files in parallel; results keep the input order.
    pub fn extract_batch(&self, paths: &[PathBuf]) -> Vec<(PathBuf, Result<FeatureVector>)> {
        paths
            .par_iter()
            .map(|path| (path.clone(), self.extract(path)))
            .collect()
    }
}
