//! Spectrum visualization data
//!
//! Computes plot-ready arrays only; drawing is left to the consumer.

pub mod pipeline;

pub use pipeline::{FrequencyScale, Spectrogram, VisualizationData, VisualizationPipeline, Waveform};
