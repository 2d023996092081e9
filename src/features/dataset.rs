//! Labeled feature datasets for offline training
//!
//! Produces the same vectors as inference, written out as JSON so the
//! training side never re-implements the extraction recipe.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{GenderError, Result};
use super::FeatureExtractor;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav"];

/// A folder of clips that all share one class label.
#[derive(Debug, Clone)]
pub struct LabeledFolder {
    pub path: PathBuf,
    pub label: u8,
}

impl LabeledFolder {
    pub fn new<P: Into<PathBuf>>(path: P, label: u8) -> Self {
        Self { path: path.into(), label }
    }

    /// Audio files directly inside the folder, sorted by path.
    pub fn audio_files(&self) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.path)
            .map_err(|e| GenderError::io(format!("Cannot read {}: {}", self.path.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_audio_extension(p))
            .collect();
        files.sort();
        Ok(files)
    }
}

fn has_audio_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.iter().any(|known| e.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureDataset {
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<u8>,
}

impl FeatureDataset {
    /// Extract every clip in `folders`. Missing folders and undecodable
    /// files are logged and skipped.
    pub fn collect(extractor: &FeatureExtractor, folders: &[LabeledFolder]) -> Self {
        let mut dataset = Self::default();

        for folder in folders {
            if !folder.path.exists() {
                log::warn!("Folder {} does not exist", folder.path.display());
                continue;
            }

            let files = match folder.audio_files() {
                Ok(files) => files,
                Err(e) => {
                    log::warn!("{}", e);
                    continue;
                }
            };

            for (path, result) in extractor.extract_batch(&files) {
                match result {
                    Ok(features) => {
                        log::info!("Processed: {}", path.display());
                        dataset.features.push(features.into_inner());
                        dataset.labels.push(folder.label);
                    }
                    Err(e) => log::warn!("Failed to process {}: {}", path.display(), e),
                }
            }
        }

        dataset
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn count_label(&self, label: u8) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string(self)
            .map_err(|e| GenderError::processing(format!("Failed to serialize dataset: {}", e)))?;
        std::fs::write(path, content)
            .map_err(|e| GenderError::io(format!("Failed to write {}: {}", path.display(), e)))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| GenderError::io(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| GenderError::processing(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioFormat, WavAudio};
    use crate::config::FeatureConfig;
    use ndarray::Array1;
    use tempfile::TempDir;

    fn write_clip(path: &Path, freq: f32) {
        let data = Array1::from_shape_fn(22050, |i| {
            (2.0 * std::f32::consts::PI * freq * i as f32 / 22050.0).sin() * 0.3
        });
        WavAudio::new_mono(22050, data, AudioFormat::Int16).save_to_file(path).unwrap();
    }

    #[test]
    fn test_collect_labeled_folders() {
        let dir = TempDir::new().unwrap();
        let female = dir.path().join("female");
        let male = dir.path().join("male");
        std::fs::create_dir_all(&female).unwrap();
        std::fs::create_dir_all(&male).unwrap();

        write_clip(&female.join("a.wav"), 220.0);
        write_clip(&female.join("b.wav"), 240.0);
        write_clip(&male.join("c.wav"), 110.0);
        std::fs::write(male.join("broken.mp3"), b"not audio").unwrap();
        std::fs::write(male.join("notes.txt"), b"ignored").unwrap();

        let extractor = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        let dataset = FeatureDataset::collect(&extractor, &[
            LabeledFolder::new(&female, 0),
            LabeledFolder::new(&male, 1),
            LabeledFolder::new(dir.path().join("missing"), 1),
        ]);

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.count_label(0), 2);
        assert_eq!(dataset.count_label(1), 1);
        assert!(dataset.features.iter().all(|f| f.len() == 40));

        let out = dir.path().join("models").join("features.json");
        dataset.save_to_file(&out).unwrap();
        assert_eq!(FeatureDataset::from_file(&out).unwrap(), dataset);
    }
}
