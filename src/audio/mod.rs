//! Audio Loading Module
//!
//! Decodes WAV (hound) and MP3 (symphonia) files into capped, resampled mono signals.

pub mod converter;
pub mod decoder;
pub mod signal;
pub mod wav;

pub use converter::AudioConverter;
pub use decoder::{load_audio, LoadOptions};
pub use signal::AudioSignal;
pub use wav::{AudioData, AudioFormat, AudioHeader, WavAudio};
