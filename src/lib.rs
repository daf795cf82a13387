//! Speech emotion recognition for short utterances.
//!
//! An audio source is decoded to mono 22.05 kHz, fixed to three seconds,
//! turned into a 128-bin log-mel spectrogram and scored by a pre-trained
//! classifier. The result is the top emotion label plus every label ranked
//! by probability.
//!
//! ```no_run
//! use speech_emotion::classifier::ModelConfig;
//! use speech_emotion::pipeline::{EmotionPipeline, PipelineConfig};
//!
//! # fn main() -> Result<(), speech_emotion::pipeline::PipelineError> {
//! let pipeline = EmotionPipeline::new(PipelineConfig::default())?;
//! let model = pipeline.load_model(&ModelConfig {
//!     model_path: "models/emotion.onnx".into(),
//!     labels_path: "models/labels.json".into(),
//!     ..Default::default()
//! })?;
//!
//! let result = pipeline.predict_file(&model, "utterance.wav")?;
//! if let Some(p) = result.confidence() {
//!     println!("{} ({:.1}%)", result.label, p * 100.0);
//! }
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod classifier;
pub mod config;
pub mod decision;
pub mod features;
pub mod pipeline;


pub use classifier::{ClassVocabulary, Classifier, EmotionModel, ModelConfig};
pub use decision::{PredictionResult, RankedLabel};
pub use pipeline::{EmotionPipeline, ErrorKind, PipelineConfig, PipelineError};
