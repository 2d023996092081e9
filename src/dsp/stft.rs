//! Short-time Fourier transform

use std::fmt;
use std::sync::Arc;
use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Centered STFT with a periodic Hann window.
///
/// The signal is zero-padded by `n_fft / 2` on both sides so frame `t` is
/// centered on sample `t * hop_length`.
#[derive(Clone)]
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl fmt::Debug for Stft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stft")
            .field("n_fft", &self.n_fft)
            .field("hop_length", &self.hop_length)
            .finish()
    }
}

impl Stft {
    pub fn new(n_fft: usize, hop_length: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);

        Self {
            n_fft,
            hop_length: hop_length.max(1),
            window: hann_window(n_fft),
            fft,
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Number of non-negative frequency bins (`n_fft / 2 + 1`).
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    pub fn num_frames(&self, signal_len: usize) -> usize {
        let padded = signal_len + 2 * (self.n_fft / 2);
        if padded < self.n_fft {
            0
        } else {
            1 + (padded - self.n_fft) / self.hop_length
        }
    }

    /// Center frequency of every bin in Hz.
    pub fn bin_frequencies(&self, sample_rate: u32) -> Vec<f32> {
        (0..self.n_bins())
            .map(|k| k as f32 * sample_rate as f32 / self.n_fft as f32)
            .collect()
    }

    /// Time of every frame center in seconds.
    pub fn frame_times(&self, n_frames: usize, sample_rate: u32) -> Vec<f32> {
        (0..n_frames)
            .map(|t| (t * self.hop_length) as f32 / sample_rate as f32)
            .collect()
    }

    /// Magnitude spectrogram `|X|`, shape (bins, frames).
    pub fn magnitude(&self, samples: &[f32]) -> Array2<f32> {
        self.transform(samples, |c| c.norm())
    }

    /// Power spectrogram `|X|^2`, shape (bins, frames).
    pub fn power(&self, samples: &[f32]) -> Array2<f32> {
        self.transform(samples, |c| c.norm_sqr())
    }

    fn transform<F>(&self, samples: &[f32], reduce: F) -> Array2<f32>
    where
        F: Fn(&Complex<f32>) -> f32,
    {
        let n_bins = self.n_bins();
        let n_frames = self.num_frames(samples.len());
        let mut out = Array2::<f32>::zeros((n_bins, n_frames));

        let pad = self.n_fft / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for t in 0..n_frames {
            let start = t * self.hop_length;
            let frame = &padded[start..start + self.n_fft];

            for ((slot, &s), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                *slot = Complex::new(s * w, 0.0);
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (k, c) in buffer.iter().take(n_bins).enumerate() {
                out[[k, t]] = reduce(c);
            }
        }

        out
    }
}

/// Periodic Hann window (`0.5 - 0.5 cos(2πn/N)`).
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| {
            let phase = 2.0 * std::f64::consts::PI * n as f64 / size as f64;
            (0.5 - 0.5 * phase.cos()) as f32
        })
        .collect()
}
