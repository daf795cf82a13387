//! Configuration for log-mel feature extraction.

use serde::{Deserialize, Serialize};

use super::N_MELS;

/// How the signal is extended before the first and after the last frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadMode {
    /// Zero padding
    Constant,
    /// Mirror the signal around its edges (excluding the edge sample)
    Reflect,
}

impl Default for PadMode {
    fn default() -> Self {
        Self::Constant
    }
}

/// Configuration for mel spectrogram generation
///
/// Defaults reproduce the training-time preprocessing: 128 Slaney mel bands
/// over 0..sr/2, 2048-point periodic Hann STFT with a 512-sample hop,
/// centered frames, power spectrum, and dB referenced to the grid maximum
/// with an 80 dB floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MelConfig {
    /// Sample rate of input audio
    pub sample_rate: u32,

    /// FFT size
    pub n_fft: usize,

    /// Hop length between frames (in samples)
    pub hop_length: usize,

    /// Window length (in samples), zero-padded to `n_fft` when shorter
    pub win_length: usize,

    /// Number of mel frequency bands
    pub n_mels: usize,

    /// Minimum frequency for mel filterbank (Hz)
    pub fmin: f32,

    /// Maximum frequency for mel filterbank (Hz), `None` for Nyquist
    pub fmax: Option<f32>,

    /// Pad the signal by `n_fft / 2` on both sides so frames are centered
    pub center: bool,

    /// Padding used when `center` is set
    pub pad_mode: PadMode,

    /// Floor applied to power values before taking the log
    pub amin: f32,

    /// Dynamic range kept below the maximum, `None` disables clipping
    pub top_db: Option<f32>,
}

impl Default for MelConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            n_fft: 2048,
            hop_length: 512,
            win_length: 2048,
            n_mels: N_MELS,
            fmin: 0.0,
            fmax: None,
            center: true,
            pad_mode: PadMode::Constant,
            amin: 1e-10,
            top_db: Some(80.0),
        }
    }
}

impl MelConfig {
    /// Number of FFT bins (n_fft/2 + 1)
    pub fn n_freqs(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Upper edge of the filterbank in Hz
    pub fn fmax_hz(&self) -> f32 {
        self.fmax.unwrap_or(self.sample_rate as f32 / 2.0)
    }

    /// Number of STFT frames produced for `n_samples` input samples
    pub fn n_frames(&self, n_samples: usize) -> usize {
        if self.center {
            1 + n_samples / self.hop_length
        } else if n_samples >= self.n_fft {
            1 + (n_samples - self.n_fft) / self.hop_length
        } else {
            0
        }
    }

    /// Check the parameters describe a computable spectrogram
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample_rate must be positive".to_string());
        }
        if self.n_fft < 2 {
            return Err(format!("n_fft must be at least 2, got {}", self.n_fft));
        }
        // Centering pads n_fft/2 per side; an odd n_fft leaves the last frame short
        if self.center && self.n_fft % 2 != 0 {
            return Err(format!(
                "n_fft must be even when frames are centered, got {}",
                self.n_fft
            ));
        }
        if self.hop_length == 0 {
            return Err("hop_length must be positive".to_string());
        }
        if self.win_length == 0 || self.win_length > self.n_fft {
            return Err(format!(
                "win_length must be in 1..={}, got {}",
                self.n_fft, self.win_length
            ));
        }
        if self.n_mels == 0 {
            return Err("n_mels must be positive".to_string());
        }
        if !(self.fmin >= 0.0 && self.fmin < self.fmax_hz()) {
            return Err(format!(
                "fmin ({}) must be below fmax ({})",
                self.fmin,
                self.fmax_hz()
            ));
        }
        if self.amin <= 0.0 {
            return Err("amin must be positive".to_string());
        }
        if matches!(self.top_db, Some(t) if t < 0.0) {
            return Err("top_db must be non-negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_config_defaults() {
        let config = MelConfig::default();
        assert_eq!(config.sample_rate, 22050);
        assert_eq!(config.n_mels, 128);
        assert_eq!(config.n_fft, 2048);
        assert_eq!(config.hop_length, 512);
        assert_eq!(config.n_freqs(), 1025);
        assert_eq!(config.fmax_hz(), 11025.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_frame_count_for_three_seconds() {
        let config = MelConfig::default();
        assert_eq!(config.n_frames(66150), 130);
    }

    #[test]
    fn test_frame_count_without_centering() {
        let config = MelConfig {
            center: false,
            ..Default::default()
        };
        assert_eq!(config.n_frames(2048), 1);
        assert_eq!(config.n_frames(2048 + 512), 2);
        assert_eq!(config.n_frames(100), 0);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let bad_hop = MelConfig {
            hop_length: 0,
            ..Default::default()
        };
        assert!(bad_hop.validate().is_err());

        let bad_window = MelConfig {
            win_length: 4096,
            ..Default::default()
        };
        assert!(bad_window.validate().is_err());

        let bad_range = MelConfig {
            fmin: 12000.0,
            ..Default::default()
        };
        assert!(bad_range.validate().is_err());
    }

    #[test]
    fn test_odd_fft_size_rejected_when_centered() {
        let odd = MelConfig {
            n_fft: 511,
            win_length: 511,
            hop_length: 128,
            ..Default::default()
        };
        assert!(odd.validate().is_err());

        let uncentered = MelConfig {
            center: false,
            ..odd
        };
        assert!(uncentered.validate().is_ok());
    }

    #[test]
    fn test_pad_mode_serde() {
        let json = serde_json::to_string(&PadMode::Reflect).unwrap();
        assert_eq!(json, "\"reflect\"");
    }
}
