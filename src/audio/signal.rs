//! Decoded mono signal

use ndarray::{Array1, ArrayView1};

/// Mono samples at a fixed sample rate. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSignal {
    samples: Array1<f32>,
    sample_rate: u32,
}

impl AudioSignal {
    pub fn new(samples: Array1<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn samples(&self) -> ArrayView1<'_, f32> {
        self.samples.view()
    }

    pub fn as_slice(&self) -> &[f32] {
        // Constructed from owned contiguous arrays only.
        self.samples.as_slice().unwrap_or(&[])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample value, 0.0 for an empty or silent signal.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |p, &s| p.max(s.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_accessors() {
        let signal = AudioSignal::new(Array1::from(vec![0.1, -0.5, 0.25, 0.0]), 4);
        assert_eq!(signal.len(), 4);
        assert_eq!(signal.sample_rate(), 4);
        assert!((signal.duration() - 1.0).abs() < f64::EPSILON);
        assert_eq!(signal.peak(), 0.5);
        assert_eq!(signal.as_slice(), &[0.1, -0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_empty_signal() {
        let signal = AudioSignal::new(Array1::zeros(0), 22050);
        assert!(signal.is_empty());
        assert_eq!(signal.peak(), 0.0);
    }
}
