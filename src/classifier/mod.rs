//! Emotion classifier: scoring backends, label vocabulary and the loaded
//! model handle shared by every inference call.

pub mod model;
pub mod onnx;
pub mod vocabulary;

pub use model::{EmotionModel, ModelConfig, OutputActivation};
pub use onnx::OnnxClassifier;
pub use vocabulary::ClassVocabulary;

use std::path::PathBuf;
use thiserror::Error;

use crate::features::ModelInput;

/// Errors that can occur while loading or running the classifier
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Model not found at path: {0}")]
    ModelNotFound(PathBuf),

    #[error("Input shape mismatch: {0}")]
    Shape(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Feature not enabled: ONNX inference requires the 'onnx' feature")]
    FeatureNotEnabled,
}

#[cfg(feature = "onnx")]
impl From<ort::Error> for ClassifierError {
    fn from(e: ort::Error) -> Self {
        ClassifierError::Inference(e.to_string())
    }
}

/// A trained scoring function over packaged log-mel features
///
/// Implementations map one model input to one score per vocabulary entry.
/// `score` takes `&self` so a loaded model can serve callers on several
/// threads; backends that are not reentrant serialize internally.
pub trait Classifier: Send + Sync {
    fn score(&self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError>;
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_large_logits_stay_finite() {
        let probs = softmax(&[1000.0, 999.0, -1000.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(probs[2], 0.0);
    }

    #[test]
    fn test_softmax_uniform() {
        let probs = softmax(&[0.5; 4]);
        assert!(probs.iter().all(|&p| (p - 0.25).abs() < 1e-7));
    }
}
