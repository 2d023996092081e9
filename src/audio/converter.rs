//! Sample rate conversion

use ndarray::{Array1, ArrayView1};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use crate::error::{GenderError, Result};

const SINC_LEN: usize = 256;

pub struct AudioConverter;

impl AudioConverter {
    /// Band-limited sample rate conversion.
    ///
    /// Content above the lower of the two Nyquist frequencies is filtered
    /// out before decimation. Output length is `ceil(len * to / from)`, aligned
    /// with the input (the filter delay is removed).
    pub fn resample(data: ArrayView1<f32>, from_rate: u32, to_rate: u32) -> Result<Array1<f32>> {
        if from_rate == 0 || to_rate == 0 {
            return Err(GenderError::processing("Sample rates must be greater than 0"));
        }
        if from_rate == to_rate {
            return Ok(data.to_owned());
        }
        if data.is_empty() {
            return Ok(Array1::zeros(0));
        }

        let ratio = to_rate as f64 / from_rate as f64;
        let new_length = (data.len() as f64 * ratio).ceil() as usize;

        // Trailing zeros flush the filter so the tail survives delay removal.
        let mut input = Vec::with_capacity(data.len() + SINC_LEN);
        input.extend(data.iter().copied());
        input.resize(data.len() + SINC_LEN, 0.0);

        let mut resampler = Self::create_resampler(ratio, input.len())?;
        let delay = resampler.output_delay();
        let output = resampler
            .process(&[input], None)
            .map_err(|e| GenderError::processing(format!("Resampling failed: {}", e)))?
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut samples: Vec<f32> = output.into_iter().skip(delay).take(new_length).collect();
        samples.resize(new_length, 0.0);

        log::trace!("Resampled {} frames {}Hz -> {} frames {}Hz", data.len(), from_rate, new_length, to_rate);
        Ok(Array1::from(samples))
    }

    fn create_resampler(ratio: f64, chunk_size: usize) -> Result<SincFixedIn<f32>> {
        let params = SincInterpolationParameters {
            sinc_len: SINC_LEN,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        SincFixedIn::<f32>::new(ratio, 1.0, params, chunk_size, 1)
            .map_err(|e| GenderError::processing(format!("Failed to create resampler: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(rate: u32, freq: f32, n: usize) -> Array1<f32> {
        Array1::from_shape_fn(n, |i| {
            (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5
        })
    }

    fn rms(data: &[f32]) -> f32 {
        (data.iter().map(|v| v * v).sum::<f32>() / data.len() as f32).sqrt()
    }

    #[test]
    fn test_resample_same_rate() {
        let data = Array1::from(vec![0.1, 0.2, 0.3]);
        let result = AudioConverter::resample(data.view(), 16000, 16000).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn test_resample_upsample_length() {
        let data = sine(8000, 300.0, 8001);
        let result = AudioConverter::resample(data.view(), 8000, 16000).unwrap();
        assert_eq!(result.len(), 16002);
    }

    #[test]
    fn test_resample_downsample_length() {
        let data = Array1::from_shape_fn(44100, |i| (i as f32 * 0.01).sin());
        let result = AudioConverter::resample(data.view(), 44100, 22050).unwrap();
        assert_eq!(result.len(), 22050);
    }

    #[test]
    fn test_passband_tone_is_preserved_and_aligned() {
        let data = sine(44100, 200.0, 44100);
        let result = AudioConverter::resample(data.view(), 44100, 22050).unwrap();
        let expected = sine(22050, 200.0, 22050);

        // Ignore the edges where the filter sees the zero padding.
        let middle = 1000..21050;
        let max_diff = result.slice(ndarray::s![middle.clone()])
            .iter()
            .zip(expected.slice(ndarray::s![middle]).iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_diff < 0.05, "max diff {}", max_diff);
    }

    #[test]
    fn test_content_above_new_nyquist_is_removed() {
        let data = sine(44100, 15000.0, 44100);
        let result = AudioConverter::resample(data.view(), 44100, 22050).unwrap();

        let input_rms = rms(data.as_slice().unwrap());
        let output_rms = rms(&result.as_slice().unwrap()[1000..21050]);
        assert!(output_rms < input_rms * 0.01, "aliased energy {} vs {}", output_rms, input_rms);
    }

    #[test]
    fn test_resample_rejects_zero_rate() {
        let data = Array1::from(vec![0.0, 1.0]);
        assert!(AudioConverter::resample(data.view(), 0, 16000).is_err());
    }
}
