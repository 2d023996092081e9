//! Format-agnostic audio loading
//!
//! WAV files go through hound; everything else (MP3 in particular) through
//! symphonia. Either way the result is mixed to mono, truncated to the
//! duration cap at the native rate, then resampled to the target rate.

use std::fs::File;
use std::path::Path;
use ndarray::Array1;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use crate::audio::{AudioConverter, AudioData, AudioSignal, WavAudio};
use crate::error::{GenderError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    pub target_sample_rate: u32,
    pub max_duration_secs: f32,
}

impl LoadOptions {
    pub fn new(target_sample_rate: u32, max_duration_secs: f32) -> Self {
        Self { target_sample_rate, max_duration_secs }
    }

    fn max_frames(&self, native_rate: u32) -> usize {
        (self.max_duration_secs as f64 * native_rate as f64).floor() as usize
    }
}

/// Decode `path` into a mono signal at `options.target_sample_rate`.
///
/// Fails with `Io` when the file cannot be opened or decoded and with
/// `Processing` when nothing is left after the duration cap.
pub fn load_audio(path: &Path, options: &LoadOptions) -> Result<AudioSignal> {
    if options.target_sample_rate == 0 {
        return Err(GenderError::processing("Target sample rate must be greater than 0"));
    }

    let (mono, native_rate) = if is_wav(path) {
        match decode_wav(path, options) {
            Ok(decoded) => decoded,
            Err(e) => {
                log::debug!("hound could not read {} ({}), trying symphonia", path.display(), e);
                decode_with_symphonia(path, options).map_err(|_| e)?
            }
        }
    } else {
        decode_with_symphonia(path, options)?
    };

    if mono.is_empty() {
        return Err(GenderError::processing(format!(
            "Decoded signal is empty: {}", path.display()
        )));
    }

    let samples = AudioConverter::resample(mono.view(), native_rate, options.target_sample_rate)?;
    let signal = AudioSignal::new(samples, options.target_sample_rate);

    log::debug!(
        "Loaded {}: {}Hz -> {}Hz, {:.2}s",
        path.display(), native_rate, options.target_sample_rate, signal.duration()
    );

    Ok(signal)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav") || e.eq_ignore_ascii_case("wave"))
        .unwrap_or(false)
}

fn decode_wav(path: &Path, options: &LoadOptions) -> Result<(Array1<f32>, u32)> {
    let header = hound::WavReader::open(path)
        .map_err(|e| GenderError::io(format!("Cannot read WAV header {}: {}", path.display(), e)))?
        .spec();
    let audio = WavAudio::from_file_capped(path, Some(options.max_frames(header.sample_rate)))?;
    Ok((audio.data().to_mono(), audio.sample_rate()))
}

fn decode_with_symphonia(path: &Path, options: &LoadOptions) -> Result<(Array1<f32>, u32)> {
    let file = File::open(path)
        .map_err(|e| GenderError::io(format!("Cannot open audio file {}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| GenderError::io(format!("Unrecognized audio format {}: {}", path.display(), e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| GenderError::io(format!("No audio track found in {}", path.display())))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| GenderError::io(format!("Unsupported codec in {}: {}", path.display(), e)))?;

    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count());
    let mut interleaved: Vec<f32> = Vec::new();
    let mut decoded_packets = 0usize;
    let mut decode_errors = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("Skipping undecodable packet in {}: {}", path.display(), e);
                decode_errors += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        decoded_packets += 1;

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        let channel_count = *channels.get_or_insert(spec.channels.count());

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(buffer.samples());

        if let Some(rate) = sample_rate {
            if channel_count > 0 && interleaved.len() / channel_count >= options.max_frames(rate) {
                break;
            }
        }
    }

    ensure_decodable(decoded_packets, decode_errors, path)?;

    let sample_rate = sample_rate
        .filter(|&r| r > 0)
        .ok_or_else(|| GenderError::io(format!("Sample rate unknown for {}", path.display())))?;
    let channels = channels.unwrap_or(1).max(1);

    let mut mono = AudioData::from_interleaved(interleaved, channels)?.to_mono();
    let cap = options.max_frames(sample_rate);
    if mono.len() > cap {
        mono = mono.slice(ndarray::s![..cap]).to_owned();
    }

    Ok((mono, sample_rate))
}

/// A stream whose every packet failed to decode is unreadable, not empty.
fn ensure_decodable(decoded_packets: usize, decode_errors: usize, path: &Path) -> Result<()> {
    if decoded_packets == 0 && decode_errors > 0 {
        return Err(GenderError::io(format!(
            "No decodable audio in {}: all {} packets failed", path.display(), decode_errors
        )));
    }
    Ok(())
}
