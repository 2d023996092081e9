//! Gender Classification Module
//!
//! Loads the pretrained network and feature scaler once and maps feature
//! vectors to labeled predictions.

pub mod model;
pub mod scaler;
pub mod service;

pub use model::{Activation, MlpClassifier, MlpArtifact, OutputActivation, ProbabilityModel};
pub use scaler::ScalerState;
pub use service::{ClassifierService, Gender, PredictionResult};
