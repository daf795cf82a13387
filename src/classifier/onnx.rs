//! Emotion classifier backed by an ONNX export of the trained network.

use std::path::Path;

#[cfg(feature = "onnx")]
use std::sync::Mutex;

#[cfg(feature = "onnx")]
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};

use super::{Classifier, ClassifierError};
use crate::features::ModelInput;

/// ONNX Runtime session scoring `(1, n_mels, frames, 1)` inputs
#[cfg(feature = "onnx")]
pub struct OnnxClassifier {
    // ONNX Runtime sessions are driven through `&mut`; the lock serializes callers
    session: Mutex<Session>,
}

#[cfg(feature = "onnx")]
impl OnnxClassifier {
    /// Load a classifier from an ONNX model file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `n_threads` - Number of intra-op threads for inference
    pub fn new(model_path: &Path, n_threads: usize) -> Result<Self, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ClassifierError::ModelLoad(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| ClassifierError::ModelLoad(e.to_string()))?
            .with_intra_threads(n_threads.max(1))
            .map_err(|e: ort::Error| ClassifierError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e: ort::Error| ClassifierError::ModelLoad(e.to_string()))?;

        tracing::info!("Loaded emotion classifier from {:?}", model_path);

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

#[cfg(feature = "onnx")]
impl Classifier for OnnxClassifier {
    fn score(&self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        let input_tensor = Value::from_array((input.shape(), input.to_vec()))
            .map_err(|e: ort::Error| ClassifierError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("classifier session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e: ort::Error| ClassifierError::Inference(e.to_string()))?;

        // Single output of shape [batch, num_classes] = [1, K]
        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| ClassifierError::Inference("No output from model".to_string()))?;

        let tensor = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e: ort::Error| ClassifierError::Inference(e.to_string()))?;

        Ok(tensor.1.to_vec())
    }
}

// Stub implementation when feature is not enabled
#[cfg(not(feature = "onnx"))]
pub struct OnnxClassifier;

#[cfg(not(feature = "onnx"))]
impl OnnxClassifier {
    pub fn new(_model_path: &Path, _n_threads: usize) -> Result<Self, ClassifierError> {
        Err(ClassifierError::FeatureNotEnabled)
    }
}

#[cfg(not(feature = "onnx"))]
impl Classifier for OnnxClassifier {
    fn score(&self, _input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        Err(ClassifierError::FeatureNotEnabled)
    }
}
