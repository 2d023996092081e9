//! Classifier service: scaler + model behind a load/predict interface

use std::fmt;
use std::path::Path;
use serde::Serialize;
use crate::error::{GenderError, Result};
use crate::features::FeatureVector;
use super::{MlpClassifier, ProbabilityModel, ScalerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Class index used by the model: 0 = female, 1 = male.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Gender::Female),
            1 => Some(Gender::Male),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: Gender,
    /// Probability of `label`, the larger of the two class probabilities.
    pub confidence: f32,
    pub probabilities: [f32; 2],
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (confidence: {:.2}%)", self.label, self.confidence * 100.0)
    }
}

/// Loaded once at startup, shared read-only afterwards.
pub struct ClassifierService {
    model: Box<dyn ProbabilityModel>,
    scaler: ScalerState,
}

impl fmt::Debug for ClassifierService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierService")
            .field("input_dim", &self.model.input_dim())
            .field("scaler", &self.scaler)
            .finish()
    }
}

impl ClassifierService {
    /// Load both artifacts; a missing or malformed one is a `ModelLoad` error.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(model_path: P, scaler_path: Q) -> Result<Self> {
        let model_path = model_path.as_ref();
        let scaler_path = scaler_path.as_ref();

        let model = MlpClassifier::from_file(model_path)?;
        let scaler = ScalerState::from_file(scaler_path)?;
        let service = Self::from_parts(Box::new(model), scaler)?;

        log::info!(
            "Loaded classifier {} with scaler {} ({} features)",
            model_path.display(), scaler_path.display(), service.input_dim()
        );
        Ok(service)
    }

    pub fn from_parts(model: Box<dyn ProbabilityModel>, scaler: ScalerState) -> Result<Self> {
        if model.input_dim() != scaler.dim() {
            return Err(GenderError::model_load(format!(
                "Model expects {} features but scaler has {}", model.input_dim(), scaler.dim()
            )));
        }
        Ok(Self { model, scaler })
    }

    pub fn input_dim(&self) -> usize {
        self.scaler.dim()
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult> {
        let scaled = self.scaler.transform(features.view())?;
        let probabilities = self.model.predict_proba(scaled.view())?;

        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(GenderError::processing("Classifier produced non-finite probabilities"));
        }
        let probabilities = probabilities.map(|p| p.clamp(0.0, 1.0));

        // Ties resolve to the first class.
        let index = if probabilities[1] > probabilities[0] { 1 } else { 0 };
        let label = Gender::from_index(index)
            .ok_or_else(|| GenderError::processing(format!("Unknown class index {}", index)))?;

        let result = PredictionResult {
            label,
            confidence: probabilities[index],
            probabilities,
        };
        log::debug!("Prediction: {} {:?}", result, probabilities);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Activation, MlpArtifact, OutputActivation};
    use ndarray::ArrayView1;

    struct FixedModel([f32; 2], usize);

    impl ProbabilityModel for FixedModel {
        fn input_dim(&self) -> usize {
            self.1
        }

        fn predict_proba(&self, _features: ArrayView1<'_, f32>) -> Result<[f32; 2]> {
            Ok(self.0)
        }
    }

    fn linear_service(weight: f32) -> ClassifierService {
        let artifact = MlpArtifact {
            hidden_activation: Activation::Identity,
            output_activation: OutputActivation::Logistic,
            coefs: vec![vec![vec![weight]; 40]],
            intercepts: vec![vec![0.0]],
        };
        let model = MlpClassifier::from_artifact(artifact).unwrap();
        let scaler = ScalerState::new(vec![0.0; 40], vec![1.0; 40]).unwrap();
        ClassifierService::from_parts(Box::new(model), scaler).unwrap()
    }

    #[test]
    fn test_gender_labels() {
        assert_eq!(Gender::from_index(0), Some(Gender::Female));
        assert_eq!(Gender::from_index(1), Some(Gender::Male));
        assert_eq!(Gender::from_index(2), None);
        assert_eq!(Gender::Male.to_string(), "male");
    }

    #[test]
    fn test_prediction_is_argmax() {
        let service = linear_service(0.1);
        let male = service.predict(&FeatureVector::from(vec![1.0; 40])).unwrap();
        assert_eq!(male.label, Gender::Male);
        assert!(male.confidence >= 0.5 && male.confidence <= 1.0);
        assert_eq!(male.confidence, male.probabilities[0].max(male.probabilities[1]));

        let female = service.predict(&FeatureVector::from(vec![-1.0; 40])).unwrap();
        assert_eq!(female.label, Gender::Female);
        assert_eq!(female.confidence, female.probabilities[0]);
    }

    #[test]
    fn test_prediction_is_stateless() {
        let service = linear_service(0.05);
        let features = FeatureVector::from((0..40).map(|i| i as f32 / 10.0 - 2.0).collect::<Vec<_>>());
        let a = service.predict(&features).unwrap();
        let b = service.predict(&features).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dimension_mismatch() {
        let service = linear_service(0.1);
        assert!(matches!(
            service.predict(&FeatureVector::from(vec![0.0; 13])),
            Err(GenderError::DimensionMismatch { expected: 40, actual: 13 })
        ));
    }

    #[test]
    fn test_tie_resolves_to_female() {
        let scaler = ScalerState::new(vec![0.0; 2], vec![1.0; 2]).unwrap();
        let service = ClassifierService::from_parts(Box::new(FixedModel([0.5, 0.5], 2)), scaler).unwrap();
        let result = service.predict(&FeatureVector::from(vec![0.0, 0.0])).unwrap();
        assert_eq!(result.label, Gender::Female);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_mismatched_parts_rejected() {
        let scaler = ScalerState::new(vec![0.0; 40], vec![1.0; 40]).unwrap();
        assert!(matches!(
            ClassifierService::from_parts(Box::new(FixedModel([1.0, 0.0], 13)), scaler),
            Err(GenderError::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_missing_artifact() {
        assert!(matches!(
            ClassifierService::load("/nonexistent/model.json", "/nonexistent/scaler.json"),
            Err(GenderError::ModelLoad { .. })
        ));
    }

    #[test]
    fn test_display() {
        let result = PredictionResult {
            label: Gender::Female,
            confidence: 0.875,
            probabilities: [0.875, 0.125],
        };
        assert_eq!(result.to_string(), "female (confidence: 87.50%)");
    }
}
