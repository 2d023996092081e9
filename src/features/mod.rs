//! MFCC Feature Extraction
//!
//! The fixed-length vector shared by inference and the offline training
//! dataset.

pub mod dataset;
pub mod extractor;

pub use dataset::{FeatureDataset, LabeledFolder};
pub use extractor::{FeatureExtractor, FeatureVector};
