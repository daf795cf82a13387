//! Loaded classifier + vocabulary pair.
//!
//! An [`EmotionModel`] is built once at startup and then only read. It is
//! handed explicitly to every pipeline call; nothing here is global.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{softmax, ClassVocabulary, Classifier, ClassifierError, OnnxClassifier};
use crate::features::ModelInput;

/// How to interpret the raw classifier output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    /// The network ends in a softmax; scores are used as-is
    Probabilities,
    /// The network emits logits; a softmax is applied here
    Logits,
}

impl Default for OutputActivation {
    fn default() -> Self {
        Self::Probabilities
    }
}

/// Configuration for loading the persisted classifier
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Path to the ONNX classifier
    pub model_path: PathBuf,
    /// Path to the label vocabulary (JSON or one-label-per-line text)
    pub labels_path: PathBuf,
    /// Number of threads for ONNX inference
    pub n_threads: usize,
    /// Interpretation of the classifier output
    pub activation: OutputActivation,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            labels_path: PathBuf::new(),
            n_threads: 1,
            activation: OutputActivation::Probabilities,
        }
    }
}

/// Immutable handle to a classifier and its class vocabulary
pub struct EmotionModel {
    classifier: Box<dyn Classifier>,
    vocabulary: ClassVocabulary,
    input_shape: [usize; 4],
    activation: OutputActivation,
}

impl fmt::Debug for EmotionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmotionModel")
            .field("vocabulary", &self.vocabulary)
            .field("input_shape", &self.input_shape)
            .field("activation", &self.activation)
            .finish_non_exhaustive()
    }
}

impl EmotionModel {
    /// Load the ONNX classifier and vocabulary named by `config`
    ///
    /// `input_shape` is the `(1, n_mels, frames, 1)` shape the feature
    /// pipeline produces. Any failure, including a classifier whose output
    /// width differs from the vocabulary size, is a load error.
    pub fn load(config: &ModelConfig, input_shape: [usize; 4]) -> Result<Self, ClassifierError> {
        let vocabulary = ClassVocabulary::load(&config.labels_path)?;
        let classifier = OnnxClassifier::new(&config.model_path, config.n_threads)?;

        let model = Self::new(Box::new(classifier), vocabulary, input_shape, config.activation)?;

        info!(
            "Emotion model ready: {} classes, input shape {:?}",
            model.vocabulary.len(),
            model.input_shape
        );

        Ok(model)
    }

    /// Pair a classifier with its vocabulary and verify they agree
    ///
    /// Runs one probe inference on an all-zero input of `input_shape`; the
    /// classifier must accept it and return exactly one score per label.
    pub fn new(
        classifier: Box<dyn Classifier>,
        vocabulary: ClassVocabulary,
        input_shape: [usize; 4],
        activation: OutputActivation,
    ) -> Result<Self, ClassifierError> {
        if input_shape[0] != 1 || input_shape[3] != 1 {
            return Err(ClassifierError::ModelLoad(format!(
                "input shape {:?} must have unit batch and channel dimensions",
                input_shape
            )));
        }

        let probe = classifier
            .score(&ModelInput::zeros(input_shape))
            .map_err(|e| {
                ClassifierError::ModelLoad(format!(
                    "classifier rejected a {:?} probe input: {}",
                    input_shape, e
                ))
            })?;

        if probe.len() != vocabulary.len() {
            return Err(ClassifierError::ModelLoad(format!(
                "classifier outputs {} scores but the vocabulary has {} labels",
                probe.len(),
                vocabulary.len()
            )));
        }

        debug!("Classifier probe passed with {} outputs", probe.len());

        Ok(Self {
            classifier,
            vocabulary,
            input_shape,
            activation,
        })
    }

    pub fn vocabulary(&self) -> &ClassVocabulary {
        &self.vocabulary
    }

    /// Input shape the classifier was verified against
    pub fn input_shape(&self) -> [usize; 4] {
        self.input_shape
    }

    pub fn activation(&self) -> OutputActivation {
        self.activation
    }

    /// Score one packaged utterance into a probability vector
    ///
    /// The returned vector is aligned with [`Self::vocabulary`].
    pub fn predict_proba(&self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        if input.shape() != self.input_shape {
            return Err(ClassifierError::Shape(format!(
                "got input of shape {:?}, model expects {:?}",
                input.shape(),
                self.input_shape
            )));
        }

        let scores = self.classifier.score(input)?;

        if scores.iter().any(|s| !s.is_finite()) {
            return Err(ClassifierError::Inference(
                "classifier produced non-finite scores".to_string(),
            ));
        }

        let probs = match self.activation {
            OutputActivation::Probabilities => scores,
            OutputActivation::Logits => softmax(&scores),
        };

        let sum: f32 = probs.iter().sum();
        if (sum - 1.0).abs() > 1e-3 || probs.iter().any(|&p| p < 0.0) {
            warn!(
                "Classifier output is not a probability distribution (sum {:.4}); \
                 check the configured output activation",
                sum
            );
        }

        Ok(probs)
    }
}
