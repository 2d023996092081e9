//! WAV audio file processing

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use hound::{SampleFormat, WavReader, WavWriter};
use ndarray::{Array1, Array2, Axis};
use crate::error::{GenderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Int8,
    Int16,
    Int24,
    Int32,
    Float32,
}

impl AudioFormat {
    pub fn name(&self) -> &'static str {
        match self {
            AudioFormat::Int8 => "int8",
            AudioFormat::Int16 => "int16",
            AudioFormat::Int24 => "int24",
            AudioFormat::Int32 => "int32",
            AudioFormat::Float32 => "float32",
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        match self {
            AudioFormat::Int8 => 8,
            AudioFormat::Int16 => 16,
            AudioFormat::Int24 => 24,
            AudioFormat::Int32 | AudioFormat::Float32 => 32,
        }
    }

    pub fn to_sample_format(self) -> SampleFormat {
        match self {
            AudioFormat::Float32 => SampleFormat::Float,
            _ => SampleFormat::Int,
        }
    }

    fn from_spec(spec: &hound::WavSpec) -> Result<Self> {
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 8) => Ok(AudioFormat::Int8),
            (SampleFormat::Int, 16) => Ok(AudioFormat::Int16),
            (SampleFormat::Int, 24) => Ok(AudioFormat::Int24),
            (SampleFormat::Int, 32) => Ok(AudioFormat::Int32),
            (SampleFormat::Float, 32) => Ok(AudioFormat::Float32),
            (format, bits) => Err(GenderError::io(format!(
                "Unsupported WAV sample format: {:?} {}-bit", format, bits
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AudioHeader {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: AudioFormat,
    /// Frames in the file, before any read cap.
    pub total_frames: u32,
    pub duration: f64,
}

impl AudioHeader {
    pub fn new(sample_rate: u32, channels: u16, format: AudioFormat, total_frames: u32) -> Self {
        let duration = if sample_rate == 0 { 0.0 } else { total_frames as f64 / sample_rate as f64 };

        Self {
            sample_rate,
            channels,
            format,
            total_frames,
            duration,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(GenderError::io("Sample rate cannot be 0"));
        }

        if self.channels == 0 {
            return Err(GenderError::io("Channel count cannot be 0"));
        }

        Ok(())
    }

    pub fn to_wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.format.bits_per_sample(),
            sample_format: self.format.to_sample_format(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AudioData {
    Mono(Array1<f32>),
    /// Frames x channels
    Multi(Array2<f32>),
}

impl AudioData {
    /// Build channel data from interleaved samples; a trailing partial frame is dropped.
    pub fn from_interleaved(samples: Vec<f32>, channels: usize) -> Result<Self> {
        if channels == 0 {
            return Err(GenderError::io("Channel count cannot be 0"));
        }
        if channels == 1 {
            return Ok(AudioData::Mono(Array1::from(samples)));
        }

        let frames = samples.len() / channels;
        let mut samples = samples;
        samples.truncate(frames * channels);
        Array2::from_shape_vec((frames, channels), samples)
            .map(AudioData::Multi)
            .map_err(|e| GenderError::io(format!("Invalid channel layout: {}", e)))
    }

    pub fn len(&self) -> usize {
        match self {
            AudioData::Mono(data) => data.len(),
            AudioData::Multi(data) => data.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channels(&self) -> u16 {
        match self {
            AudioData::Mono(_) => 1,
            AudioData::Multi(data) => data.ncols() as u16,
        }
    }

    /// Average all channels into one.
    pub fn to_mono(&self) -> Array1<f32> {
        match self {
            AudioData::Mono(data) => data.clone(),
            AudioData::Multi(data) => data
                .mean_axis(Axis(1))
                .unwrap_or_else(|| Array1::zeros(data.nrows())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WavAudio {
    pub header: AudioHeader,
    pub data: AudioData,
}

impl WavAudio {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file_capped(path, None)
    }

    /// Read at most `max_frames` frames from the start of the file.
    pub fn from_file_capped<P: AsRef<Path>>(path: P, max_frames: Option<usize>) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path)
            .map_err(|e| GenderError::io(format!("Cannot open audio file {}: {}", path.display(), e)))?;

        let mut reader = WavReader::new(BufReader::new(file))
            .map_err(|e| GenderError::io(format!("Cannot create WAV reader for {}: {}", path.display(), e)))?;

        let spec = reader.spec();
        let format = AudioFormat::from_spec(&spec)?;
        let header = AudioHeader::new(spec.sample_rate, spec.channels, format, reader.duration());
        header.validate()?;

        let channels = spec.channels as usize;
        let limit = max_frames
            .map(|frames| frames.saturating_mul(channels))
            .unwrap_or(usize::MAX);

        let samples = match format {
            AudioFormat::Float32 => read_samples::<f32, _>(&mut reader, limit, |s| s)?,
            AudioFormat::Int8 => read_samples::<i8, _>(&mut reader, limit, |s| s as f32 / 128.0)?,
            AudioFormat::Int16 => read_samples::<i16, _>(&mut reader, limit, |s| s as f32 / 32768.0)?,
            AudioFormat::Int24 => read_samples::<i32, _>(&mut reader, limit, |s| s as f32 / 8_388_608.0)?,
            AudioFormat::Int32 => read_samples::<i32, _>(&mut reader, limit, |s| s as f32 / 2_147_483_648.0)?,
        };

        log::debug!(
            "WAV {}: {}Hz, {}ch, {}, {:.2}s in file, {} samples read",
            path.display(), spec.sample_rate, spec.channels, format.name(), header.duration, samples.len()
        );

        Ok(WavAudio {
            header,
            data: AudioData::from_interleaved(samples, channels)?,
        })
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GenderError::io(format!("Cannot create output directory: {}", e)))?;
        }

        let spec = self.header.to_wav_spec();
        let mut writer = WavWriter::create(path, spec)
            .map_err(|e| GenderError::io(format!("Cannot create output file {}: {}", path.display(), e)))?;

        let interleaved: Vec<f32> = match &self.data {
            AudioData::Mono(data) => data.to_vec(),
            AudioData::Multi(data) => data.iter().copied().collect(),
        };

        for sample in interleaved {
            let clamped = sample.clamp(-1.0, 1.0);
            match self.header.format {
                AudioFormat::Float32 => writer.write_sample(clamped)?,
                AudioFormat::Int8 => writer.write_sample((clamped * 127.0) as i8)?,
                AudioFormat::Int16 => writer.write_sample((clamped * 32767.0) as i16)?,
                AudioFormat::Int24 => writer.write_sample((clamped * 8_388_607.0) as i32)?,
                AudioFormat::Int32 => writer.write_sample((clamped as f64 * 2_147_483_647.0) as i32)?,
            }
        }

        writer.finalize()
            .map_err(|e| GenderError::io(format!("Failed to finalize WAV writing: {}", e)))?;

        Ok(())
    }

    pub fn new_mono(sample_rate: u32, data: Array1<f32>, format: AudioFormat) -> Self {
        let header = AudioHeader::new(sample_rate, 1, format, data.len() as u32);

        WavAudio {
            header,
            data: AudioData::Mono(data),
        }
    }

    pub fn new_multi(sample_rate: u32, data: Array2<f32>, format: AudioFormat) -> Result<Self> {
        if data.ncols() == 0 {
            return Err(GenderError::io("Multi-channel data must have at least one column"));
        }

        let header = AudioHeader::new(sample_rate, data.ncols() as u16, format, data.nrows() as u32);

        Ok(WavAudio {
            header,
            data: AudioData::Multi(data),
        })
    }

    pub fn data(&self) -> &AudioData {
        &self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.header.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.header.channels
    }

    pub fn format(&self) -> AudioFormat {
        self.header.format
    }
}

fn read_samples<S, F>(
    reader: &mut WavReader<BufReader<File>>,
    limit: usize,
    convert: F,
) -> Result<Vec<f32>>
where
    S: hound::Sample,
    F: Fn(S) -> f32,
{
    reader
        .samples::<S>()
        .take(limit)
        .map(|sample| {
            sample
                .map(&convert)
                .map_err(|e| GenderError::io(format!("Failed to read sample: {}", e)))
        })
        .collect()
}
