//! Feature extraction: log-mel spectrogram and model input packaging.

pub mod config;
pub mod mel;
pub mod tensor;

pub use config::{MelConfig, PadMode};
pub use mel::{power_to_db, LogMelExtractor, LogMelSpectrogram};
pub use tensor::{input_shape, package, ModelInput};

use thiserror::Error;

/// Number of mel bins the classifier consumes
pub const N_MELS: usize = 128;

/// Errors that can occur during feature extraction
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Feature shape mismatch: {0}")]
    Shape(String),

    #[error("Invalid feature configuration: {0}")]
    Config(String),

    #[error("Invalid audio input: {0}")]
    InvalidInput(String),

    #[error("FFT failed: {0}")]
    Fft(String),
}
