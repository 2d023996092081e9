//! Mel filterbank (Slaney scale, Slaney area normalization)

use ndarray::Array2;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Triangular mel filters, shape (n_mels, n_fft / 2 + 1).
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    filters: Array2<f32>,
}

impl MelFilterbank {
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f64, fmax: f64) -> Self {
        let n_bins = n_fft / 2 + 1;
        let fft_freqs: Vec<f64> = (0..n_bins)
            .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
            .collect();

        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let mel_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
            .collect();

        let mut filters = Array2::<f32>::zeros((n_mels, n_bins));
        for m in 0..n_mels {
            let lower_width = mel_points[m + 1] - mel_points[m];
            let upper_width = mel_points[m + 2] - mel_points[m + 1];
            let enorm = 2.0 / (mel_points[m + 2] - mel_points[m]);

            for (k, &f) in fft_freqs.iter().enumerate() {
                let lower = (f - mel_points[m]) / lower_width;
                let upper = (mel_points[m + 2] - f) / upper_width;
                let weight = lower.min(upper).max(0.0);
                filters[[m, k]] = (weight * enorm) as f32;
            }
        }

        Self { filters }
    }

    /// Filterbank spanning 0 Hz to Nyquist.
    pub fn full_band(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        Self::new(sample_rate, n_fft, n_mels, 0.0, sample_rate as f64 / 2.0)
    }

    pub fn n_mels(&self) -> usize {
        self.filters.nrows()
    }

    pub fn filters(&self) -> &Array2<f32> {
        &self.filters
    }

    /// Project a (bins, frames) power spectrogram onto the mel axis.
    pub fn apply(&self, power: &Array2<f32>) -> Array2<f32> {
        self.filters.dot(power)
    }
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}
