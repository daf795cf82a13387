//! End-to-end emotion prediction for one utterance.
//!
//! Loader -> duration normalizer -> log-mel extractor -> tensor packager ->
//! classifier -> decision. Each call is independent; the only shared state
//! is the read-only [`EmotionModel`] passed in by the caller.

use std::fmt;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::audio::{
    self, expected_len, normalize_duration, AudioError, Waveform, CANONICAL_SAMPLE_RATE,
    DURATION_SECONDS,
};
use crate::classifier::{ClassifierError, EmotionModel, ModelConfig};
use crate::decision::{decide, PredictionResult, RankingError};
use crate::features::{
    input_shape, package, FeatureError, LogMelExtractor, MelConfig, ModelInput, N_MELS,
};

/// Coarse error category reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unreadable or unsupported audio source
    Decode,
    /// Feature tensor does not match the classifier
    Shape,
    /// Classifier or vocabulary could not be loaded
    ModelLoad,
    /// Probability vector does not match the vocabulary
    Value,
    /// The classifier failed while scoring
    Inference,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decode => "DecodeError",
            Self::Shape => "ShapeError",
            Self::ModelLoad => "ModelLoadError",
            Self::Value => "ValueError",
            Self::Inference => "InferenceError",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while running the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    Ranking(#[from] RankingError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Audio(_) => ErrorKind::Decode,
            // A mis-configured extractor produces tensors the model cannot take
            Self::Feature(_) => ErrorKind::Shape,
            Self::Classifier(ClassifierError::Shape(_)) => ErrorKind::Shape,
            Self::Classifier(ClassifierError::Inference(_)) => ErrorKind::Inference,
            Self::Classifier(_) => ErrorKind::ModelLoad,
            Self::Ranking(_) => ErrorKind::Value,
        }
    }
}

/// Preprocessing parameters shared with training
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Rate every source is resampled to
    pub sample_rate: u32,
    /// Fixed utterance length in seconds
    pub duration_secs: f32,
    /// Spectrogram parameters
    pub mel: MelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: CANONICAL_SAMPLE_RATE,
            duration_secs: DURATION_SECONDS,
            mel: MelConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Number of samples after duration normalization
    pub fn expected_len(&self) -> usize {
        expected_len(self.sample_rate, self.duration_secs)
    }

    /// Number of spectrogram frames for a normalized utterance
    pub fn n_frames(&self) -> usize {
        self.mel.n_frames(self.expected_len())
    }

    /// Shape of the tensor handed to the classifier
    pub fn input_shape(&self) -> [usize; 4] {
        input_shape(self.mel.n_mels, self.n_frames())
    }
}

/// Stateless feature pipeline; cheap to share between threads
pub struct EmotionPipeline {
    config: PipelineConfig,
    extractor: LogMelExtractor,
}

impl EmotionPipeline {
    /// Create a pipeline, checking the audio and spectrogram settings agree
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        if config.mel.sample_rate != config.sample_rate {
            return Err(FeatureError::Config(format!(
                "mel config is for {} Hz but audio is resampled to {} Hz",
                config.mel.sample_rate, config.sample_rate
            ))
            .into());
        }
        if !(config.duration_secs > 0.0) {
            return Err(FeatureError::Config(format!(
                "utterance duration must be positive, got {}",
                config.duration_secs
            ))
            .into());
        }

        let extractor = LogMelExtractor::new(config.mel.clone())?;

        debug!(
            "Pipeline ready: {} samples per utterance, input shape {:?}",
            config.expected_len(),
            config.input_shape()
        );

        Ok(Self { config, extractor })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the classifier for this pipeline's input shape
    pub fn load_model(&self, model_config: &ModelConfig) -> Result<EmotionModel, PipelineError> {
        Ok(EmotionModel::load(model_config, self.config.input_shape())?)
    }

    /// Normalize, extract and package a waveform for an [`N_MELS`]-bin classifier
    pub fn features(&self, waveform: Waveform) -> Result<ModelInput, PipelineError> {
        self.features_for(waveform, N_MELS)
    }

    /// Normalize, extract and package a waveform, requiring `n_mels` bins
    fn features_for(&self, waveform: Waveform, n_mels: usize) -> Result<ModelInput, PipelineError> {
        let waveform = waveform.resampled(self.config.sample_rate)?;
        let original_len = waveform.len();

        let fixed = normalize_duration(waveform, self.config.duration_secs);
        let spectrogram = self.extractor.extract(&fixed)?;
        let input = package(spectrogram, n_mels)?;

        debug!(
            "Features: {} -> {} samples, tensor {:?}",
            original_len,
            fixed.len(),
            input.shape()
        );

        Ok(input)
    }

    /// Classify a decoded waveform
    pub fn predict_waveform(
        &self,
        model: &EmotionModel,
        waveform: Waveform,
    ) -> Result<PredictionResult, PipelineError> {
        let input = self.features_for(waveform, model.input_shape()[1])?;
        let probabilities = model.predict_proba(&input)?;
        let result = decide(&probabilities, model.vocabulary())?;

        debug!(
            "Predicted {} ({:.1}%)",
            result.label,
            result.confidence().unwrap_or(0.0) * 100.0
        );

        Ok(result)
    }

    /// Classify an audio file
    pub fn predict_file<P: AsRef<Path>>(
        &self,
        model: &EmotionModel,
        path: P,
    ) -> Result<PredictionResult, PipelineError> {
        let waveform = audio::load_file_at(path, self.config.sample_rate)?;
        self.predict_waveform(model, waveform)
    }

    /// Classify an encoded audio byte stream
    pub fn predict_bytes(
        &self,
        model: &EmotionModel,
        data: &[u8],
        format_hint: Option<&str>,
    ) -> Result<PredictionResult, PipelineError> {
        let waveform = audio::load_bytes_at(data, format_hint, self.config.sample_rate)?;
        self.predict_waveform(model, waveform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_shapes() {
        let config = PipelineConfig::default();
        assert_eq!(config.expected_len(), 66150);
        assert_eq!(config.n_frames(), 130);
        assert_eq!(config.input_shape(), [1, 128, 130, 1]);
    }

    #[test]
    fn test_mismatched_rates_rejected() {
        let config = PipelineConfig {
            sample_rate: 16000,
            ..Default::default()
        };
        let result = EmotionPipeline::new(config);
        assert!(matches!(
            result,
            Err(PipelineError::Feature(FeatureError::Config(_)))
        ));
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        let config = PipelineConfig {
            duration_secs: 0.0,
            ..Default::default()
        };
        assert!(EmotionPipeline::new(config).is_err());
    }

    #[test]
    fn test_error_kinds() {
        let decode: PipelineError = AudioError::Decode("x".to_string()).into();
        assert_eq!(decode.kind(), ErrorKind::Decode);

        let shape: PipelineError = FeatureError::Shape("x".to_string()).into();
        assert_eq!(shape.kind(), ErrorKind::Shape);

        let load: PipelineError = ClassifierError::ModelLoad("x".to_string()).into();
        assert_eq!(load.kind(), ErrorKind::ModelLoad);

        let value: PipelineError = RankingError::LengthMismatch {
            expected: 3,
            actual: 2,
        }
        .into();
        assert_eq!(value.kind(), ErrorKind::Value);
        assert_eq!(value.kind().to_string(), "ValueError");

        let nan: PipelineError = RankingError::NonFinite {
            index: 0,
            value: f32::NAN,
        }
        .into();
        assert_eq!(nan.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_features_reject_non_standard_bin_count() {
        let pipeline = EmotionPipeline::new(PipelineConfig {
            mel: MelConfig {
                n_mels: 64,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();

        let err = pipeline
            .features(Waveform::new(vec![0.1; 22050], 22050))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Feature(FeatureError::Shape(_))));
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn test_features_resample_foreign_rate() {
        let pipeline = EmotionPipeline::new(PipelineConfig::default()).unwrap();
        let waveform = Waveform::new(vec![0.0; 16000], 16000);
        let input = pipeline.features(waveform).unwrap();
        assert_eq!(input.shape(), [1, 128, 130, 1]);
    }
}
