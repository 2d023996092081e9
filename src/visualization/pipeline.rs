//! Waveform and log-magnitude spectrogram computation

use std::path::{Path, PathBuf};
use ndarray::{Array2, Axis};
use serde::Serialize;
use crate::audio::{load_audio, AudioSignal, LoadOptions};
use crate::config::VisualizationConfig;
use crate::dsp::{amplitude_to_db, Stft};
use crate::error::{GenderError, Result};

const AMPLITUDE_AMIN: f32 = 1e-5;

/// How the frequency axis is meant to be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyScale {
    Linear,
    Log,
}

#[derive(Debug, Clone, Serialize)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_secs: f64,
    /// Largest absolute sample, for vertical scaling.
    pub peak: f32,
}

impl Waveform {
    pub fn from_signal(signal: &AudioSignal) -> Self {
        Self {
            samples: signal.as_slice().to_vec(),
            sample_rate: signal.sample_rate(),
            duration_secs: signal.duration(),
            peak: signal.peak(),
        }
    }

    /// `(min, max)` per bucket for drawing at reduced width.
    pub fn envelope(&self, buckets: usize) -> Vec<(f32, f32)> {
        if buckets == 0 || self.samples.is_empty() {
            return Vec::new();
        }
        let chunk = self.samples.len().div_ceil(buckets);
        self.samples
            .chunks(chunk)
            .map(|c| {
                c.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)))
            })
            .collect()
    }
}

/// dB matrix indexed (frequency bin, time frame), 0 dB at the clip's peak.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub db: Array2<f32>,
    pub frequencies_hz: Vec<f32>,
    pub times_secs: Vec<f32>,
    pub frequency_scale: FrequencyScale,
    pub db_range: (f32, f32),
}

impl Spectrogram {
    pub fn n_bins(&self) -> usize {
        self.db.nrows()
    }

    pub fn n_frames(&self) -> usize {
        self.db.ncols()
    }

    /// Mean level of every frequency bin over time.
    pub fn mean_spectrum(&self) -> Vec<f32> {
        self.db
            .mean_axis(Axis(1))
            .map(|m| m.to_vec())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct VisualizationData {
    pub source: PathBuf,
    pub waveform: Waveform,
    pub spectrogram: Spectrogram,
}

#[derive(Serialize)]
struct VisualizationExport<'a> {
    source: &'a Path,
    waveform: &'a Waveform,
    frequencies_hz: &'a [f32],
    times_secs: &'a [f32],
    frequency_scale: FrequencyScale,
    db_range: (f32, f32),
    db: Vec<Vec<f32>>,
}

impl VisualizationData {
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let spec = &self.spectrogram;
        let export = VisualizationExport {
            source: &self.source,
            waveform: &self.waveform,
            frequencies_hz: &spec.frequencies_hz,
            times_secs: &spec.times_secs,
            frequency_scale: spec.frequency_scale,
            db_range: spec.db_range,
            db: spec.db.outer_iter().map(|row| row.to_vec()).collect(),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(&export)
            .map_err(|e| GenderError::processing(format!("Failed to serialize visualization: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| GenderError::io(format!("Failed to write {}: {}", path.display(), e)))
    }
}

#[derive(Debug, Clone)]
pub struct VisualizationPipeline {
    config: VisualizationConfig,
    stft: Stft,
}

impl VisualizationPipeline {
    pub fn new(config: VisualizationConfig) -> Self {
        let stft = Stft::new(config.n_fft, config.hop_length);
        Self { config, stft }
    }

    pub fn config(&self) -> &VisualizationConfig {
        &self.config
    }

    /// Decode at most the configured duration, resampled to the display rate.
    pub fn decode(&self, path: &Path) -> Result<AudioSignal> {
        let options = LoadOptions::new(self.config.sample_rate, self.config.max_duration_secs);
        load_audio(path, &options)
    }

    pub fn waveform(&self, signal: &AudioSignal) -> Waveform {
        Waveform::from_signal(signal)
    }

    pub fn spectrogram(&self, signal: &AudioSignal) -> Result<Spectrogram> {
        if signal.is_empty() {
            return Err(GenderError::processing("Cannot compute spectrogram of an empty signal"));
        }

        let magnitude = self.stft.magnitude(signal.as_slice());
        let db = amplitude_to_db(&magnitude, AMPLITUDE_AMIN, Some(self.config.top_db));
        let min = db.iter().copied().fold(f32::INFINITY, f32::min);
        let max = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        Ok(Spectrogram {
            frequencies_hz: self.stft.bin_frequencies(signal.sample_rate()),
            times_secs: self.stft.frame_times(db.ncols(), signal.sample_rate()),
            frequency_scale: FrequencyScale::Log,
            db_range: (min, max),
            db,
        })
    }

    pub fn compute(&self, path: &Path) -> Result<VisualizationData> {
        self.render(path, &mut |_| {})
    }

    /// Same as [`compute`](Self::compute), reporting 10, 40, 60 and 80 as
    /// each stage starts or finishes.
    pub fn render(&self, path: &Path, progress: &mut dyn FnMut(u8)) -> Result<VisualizationData> {
        progress(10);
        let signal = self.decode(path)?;
        log::debug!(
            "Decoded {} for visualization: {} samples at {} Hz",
            path.display(), signal.len(), signal.sample_rate()
        );
        progress(40);

        let waveform = self.waveform(&signal);
        progress(60);

        let spectrogram = self.spectrogram(&signal)?;
        progress(80);

        Ok(VisualizationData {
            source: path.to_path_buf(),
            waveform,
            spectrogram,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFormat, WavAudio};
    use ndarray::Array1;
    use tempfile::TempDir;

    fn tone(path: &Path, sample_rate: u32, secs: f32, freq: f32) {
        let n = (sample_rate as f32 * secs) as usize;
        let data = Array1::from_shape_fn(n, |i| {
            (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5
        });
        WavAudio::new_mono(sample_rate, data, AudioFormat::Int16).save_to_file(path).unwrap();
    }

    #[test]
    fn test_compute_shapes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        tone(&path, 22050, 2.0, 440.0);

        let pipeline = VisualizationPipeline::new(VisualizationConfig::default());
        let data = pipeline.compute(&path).unwrap();

        assert_eq!(data.waveform.samples.len(), 44100);
        assert_eq!(data.spectrogram.n_bins(), 1025);
        assert_eq!(data.spectrogram.n_frames(), 1 + 44100 / 512);
        assert_eq!(data.spectrogram.frequencies_hz.len(), data.spectrogram.n_bins());
        assert_eq!(data.spectrogram.times_secs.len(), data.spectrogram.n_frames());
        assert!(data.spectrogram.db_range.1.abs() < 1e-4);
        assert!(data.spectrogram.db_range.0 >= -80.0 - 1e-3);
    }

    #[test]
    fn test_ten_second_cap_and_resample() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.wav");
        tone(&path, 16000, 12.0, 200.0);

        let pipeline = VisualizationPipeline::new(VisualizationConfig::default());
        let data = pipeline.compute(&path).unwrap();
        assert_eq!(data.waveform.sample_rate, 22050);
        assert!((data.waveform.duration_secs - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_render_progress_checkpoints() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        tone(&path, 22050, 0.5, 300.0);

        let pipeline = VisualizationPipeline::new(VisualizationConfig::default());
        let mut seen = Vec::new();
        pipeline.render(&path, &mut |p| seen.push(p)).unwrap();
        assert_eq!(seen, vec![10, 40, 60, 80]);
    }

    #[test]
    fn test_corrupt_file_stops_after_first_checkpoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let pipeline = VisualizationPipeline::new(VisualizationConfig::default());
        let mut seen = Vec::new();
        let result = pipeline.render(&path, &mut |p| seen.push(p));
        assert!(matches!(result, Err(GenderError::Io { .. })));
        assert_eq!(seen, vec![10]);
    }

    #[test]
    fn test_envelope() {
        let waveform = Waveform {
            samples: vec![0.1, -0.4, 0.3, 0.9, -0.2],
            sample_rate: 5,
            duration_secs: 1.0,
            peak: 0.9,
        };
        assert_eq!(waveform.envelope(2), vec![(-0.4, 0.3), (-0.2, 0.9)]);
        assert!(waveform.envelope(0).is_empty());
    }

    #[test]
    fn test_save_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tone.wav");
        tone(&path, 22050, 0.25, 440.0);

        let pipeline = VisualizationPipeline::new(VisualizationConfig::default());
        let data = pipeline.compute(&path).unwrap();
        let out = dir.path().join("out").join("viz.json");
        data.save_json(&out).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(value["frequency_scale"], "log");
        assert_eq!(value["db"].as_array().unwrap().len(), 1025);
    }
}
