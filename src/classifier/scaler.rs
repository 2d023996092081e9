//! Per-feature standardization learned at training time

use std::path::Path;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use crate::error::{GenderError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerArtifact {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

/// Learned (mean, std) per feature dimension. Immutable after loading.
///
/// A std that is zero, negative or non-finite leaves its dimension
/// unscaled: the mean is subtracted and nothing is divided.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerState {
    mean: Array1<f32>,
    scale: Array1<f32>,
}

impl ScalerState {
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> Result<Self> {
        if mean.is_empty() {
            return Err(GenderError::model_load("Scaler has no dimensions"));
        }
        if mean.len() != scale.len() {
            return Err(GenderError::model_load(format!(
                "Scaler has {} means but {} scales", mean.len(), scale.len()
            )));
        }
        if mean.iter().any(|v| !v.is_finite()) {
            return Err(GenderError::model_load("Scaler mean contains non-finite values"));
        }

        let degenerate = scale.iter().filter(|s| !usable_scale(**s)).count();
        if degenerate > 0 {
            log::warn!("Scaler has {} zero-variance dimension(s); they are only mean-centered", degenerate);
        }

        Ok(Self {
            mean: Array1::from(mean),
            scale: Array1::from(scale),
        })
    }

    /// Fit mean and population std over `rows`. Constant columns get a
    /// scale of 1.0.
    pub fn fit(rows: &[Vec<f32>]) -> Result<Self> {
        let dim = rows.first().map(Vec::len).unwrap_or(0);
        if dim == 0 {
            return Err(GenderError::processing("Cannot fit a scaler on an empty dataset"));
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != dim) {
            return Err(GenderError::dimension_mismatch(dim, bad.len()));
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0f64; dim];
        for row in rows {
            for (m, &v) in mean.iter_mut().zip(row) {
                *m += v as f64 / n;
            }
        }

        let mut var = vec![0.0f64; dim];
        for row in rows {
            for ((s, &v), &m) in var.iter_mut().zip(row).zip(&mean) {
                let d = v as f64 - m;
                *s += d * d / n;
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let std = v.sqrt() as f32;
                if std > f32::EPSILON { std } else { 1.0 }
            })
            .collect();
        Self::new(mean.into_iter().map(|m| m as f32).collect(), scale)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| GenderError::model_load(format!("Cannot read scaler {}: {}", path.display(), e)))?;
        let artifact: ScalerArtifact = serde_json::from_str(&content)
            .map_err(|e| GenderError::model_load(format!("Malformed scaler {}: {}", path.display(), e)))?;
        Self::new(artifact.mean, artifact.scale)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let artifact = ScalerArtifact {
            mean: self.mean.to_vec(),
            scale: self.scale.to_vec(),
        };
        let content = serde_json::to_string_pretty(&artifact)
            .map_err(|e| GenderError::processing(format!("Failed to serialize scaler: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// `(x - mean) / std` per dimension.
    pub fn transform(&self, features: ArrayView1<'_, f32>) -> Result<Array1<f32>> {
        if features.len() != self.dim() {
            return Err(GenderError::dimension_mismatch(self.dim(), features.len()));
        }

        let mut scaled = &features - &self.mean;
        for (value, &scale) in scaled.iter_mut().zip(self.scale.iter()) {
            if usable_scale(scale) {
                *value /= scale;
            }
        }
        Ok(scaled)
    }
}

fn usable_scale(scale: f32) -> bool {
    scale.is_finite() && scale > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    #[test]
    fn test_transform() {
        let scaler = ScalerState::new(vec![1.0, -2.0], vec![2.0, 0.5]).unwrap();
        let out = scaler.transform(array![3.0f32, -1.0].view()).unwrap();
        assert_eq!(out, array![1.0f32, 2.0]);
    }

    #[test]
    fn test_zero_variance_is_mean_only() {
        let scaler = ScalerState::new(vec![1.0, 1.0, 1.0], vec![0.0, f32::NAN, -3.0]).unwrap();
        let out = scaler.transform(array![4.0f32, 4.0, 4.0].view()).unwrap();
        assert_eq!(out, array![3.0f32, 3.0, 3.0]);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_dimension_mismatch() {
        let scaler = ScalerState::new(vec![0.0; 40], vec![1.0; 40]).unwrap();
        assert!(matches!(
            scaler.transform(Array1::<f32>::zeros(13).view()),
            Err(GenderError::DimensionMismatch { expected: 40, actual: 13 })
        ));
    }

    #[test]
    fn test_invalid_artifacts() {
        assert!(ScalerState::new(vec![], vec![]).is_err());
        assert!(ScalerState::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(ScalerState::new(vec![f32::INFINITY], vec![1.0]).is_err());

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scaler.json");
        std::fs::write(&path, "{\"mean\": [1.0]").unwrap();
        assert!(matches!(ScalerState::from_file(&path), Err(GenderError::ModelLoad { .. })));
    }

    #[test]
    fn test_fit() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = ScalerState::fit(&rows).unwrap();
        assert_eq!(scaler, ScalerState::new(vec![2.0, 5.0], vec![1.0, 1.0]).unwrap());

        let scaled = scaler.transform(array![3.0f32, 5.0].view()).unwrap();
        assert_eq!(scaled, array![1.0f32, 0.0]);

        assert!(ScalerState::fit(&[]).is_err());
        assert!(matches!(
            ScalerState::fit(&[vec![1.0, 2.0], vec![1.0]]),
            Err(GenderError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scaler.json");
        let scaler = ScalerState::new(vec![0.5, -0.25], vec![1.5, 2.0]).unwrap();
        scaler.save_to_file(&path).unwrap();
        assert_eq!(ScalerState::from_file(&path).unwrap(), scaler);
    }
}
