//! Audio front end: decoding, resampling and fixed-duration normalization.
//!
//! Every utterance is brought to mono `f32` at [`CANONICAL_SAMPLE_RATE`]
//! and then cut or zero-padded to exactly [`DURATION_SECONDS`] before any
//! feature extraction happens.

pub mod loader;
pub mod normalize;
pub mod resampler;

pub use loader::{load_bytes, load_bytes_at, load_file, load_file_at, Waveform};
pub use normalize::{expected_len, normalize_duration, FixedLengthWaveform};
pub use resampler::{resample, AudioResampler};

use thiserror::Error;

/// Sample rate the classifier was trained at
pub const CANONICAL_SAMPLE_RATE: u32 = 22050;

/// Utterance length the classifier was trained on
pub const DURATION_SECONDS: f32 = 3.0;

/// Errors that can occur while turning an audio source into samples
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Resampling failed: {0}")]
    Resample(String),
}

/// Average interleaved frames down to a single channel
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_mono_passthrough() {
        let samples = vec![0.1, -0.2, 0.3];
        assert_eq!(downmix_to_mono(&samples, 1), samples);
    }

    #[test]
    fn test_downmix_stereo_averages_frames() {
        let stereo = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = downmix_to_mono(&stereo, 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_canonical_constants() {
        assert_eq!(CANONICAL_SAMPLE_RATE, 22050);
        assert_eq!(DURATION_SECONDS, 3.0);
    }
}
