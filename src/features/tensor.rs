//! Packaging of spectrograms into the classifier's 4-D input layout.

use ndarray::{Array4, Axis};

use super::mel::LogMelSpectrogram;
use super::FeatureError;

/// Classifier input tensor of shape `(batch=1, n_mels, frames, channel=1)`
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    tensor: Array4<f32>,
}

impl ModelInput {
    /// All-zero input of the given shape
    pub fn zeros(shape: [usize; 4]) -> Self {
        Self {
            tensor: Array4::zeros(shape),
        }
    }

    /// Shape as `[batch, n_mels, frames, channel]`
    pub fn shape(&self) -> [usize; 4] {
        let s = self.tensor.shape();
        [s[0], s[1], s[2], s[3]]
    }

    pub fn tensor(&self) -> &Array4<f32> {
        &self.tensor
    }

    /// Row-major copy of the tensor data
    pub fn to_vec(&self) -> Vec<f32> {
        self.tensor.iter().copied().collect()
    }
}

/// Model input shape for a spectrogram of `n_mels x frames`
pub fn input_shape(n_mels: usize, frames: usize) -> [usize; 4] {
    [1, n_mels, frames, 1]
}

/// Add the unit batch and channel axes around a spectrogram
///
/// Fails when the spectrogram does not carry `n_mels` bins, which means the
/// extractor and the classifier were configured differently.
pub fn package(spectrogram: LogMelSpectrogram, n_mels: usize) -> Result<ModelInput, FeatureError> {
    if spectrogram.n_mels() != n_mels {
        return Err(FeatureError::Shape(format!(
            "spectrogram has {} mel bins, expected {}",
            spectrogram.n_mels(),
            n_mels
        )));
    }

    let tensor = spectrogram
        .into_values()
        .insert_axis(Axis(2))
        .insert_axis(Axis(0));

    Ok(ModelInput { tensor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::N_MELS;
    use ndarray::Array2;

    fn grid(n_mels: usize, frames: usize) -> LogMelSpectrogram {
        let values = Array2::from_shape_fn((n_mels, frames), |(m, t)| -((m * frames + t) as f32));
        LogMelSpectrogram::new(values)
    }

    #[test]
    fn test_package_shape() {
        let input = package(grid(128, 130), 128).unwrap();
        assert_eq!(input.shape(), [1, 128, 130, 1]);
        assert_eq!(input.tensor().ndim(), 4);
        assert_eq!(input.shape(), input_shape(128, 130));
    }

    #[test]
    fn test_package_preserves_values_and_order() {
        let spec = grid(4, 3);
        let expected = spec.values().clone();
        let input = package(spec, 4).unwrap();

        for m in 0..4 {
            for t in 0..3 {
                assert_eq!(input.tensor()[[0, m, t, 0]], expected[[m, t]]);
            }
        }
        // Row-major flattening walks frames fastest within each mel bin
        let flat = input.to_vec();
        assert_eq!(flat[0], expected[[0, 0]]);
        assert_eq!(flat[1], expected[[0, 1]]);
        assert_eq!(flat[3], expected[[1, 0]]);
    }

    #[test]
    fn test_package_rejects_wrong_bin_count() {
        let result = package(grid(64, 130), 128);
        assert!(matches!(result, Err(FeatureError::Shape(_))));
    }

    #[test]
    fn test_package_against_classifier_bin_count() {
        let input = package(grid(N_MELS, 130), N_MELS).unwrap();
        assert_eq!(input.shape(), [1, 128, 130, 1]);

        let result = package(grid(64, 130), N_MELS);
        assert!(matches!(result, Err(FeatureError::Shape(_))));
    }

    #[test]
    fn test_zeros_input() {
        let input = ModelInput::zeros([1, 8, 5, 1]);
        assert_eq!(input.shape(), [1, 8, 5, 1]);
        assert!(input.to_vec().iter().all(|&v| v == 0.0));
    }
}
