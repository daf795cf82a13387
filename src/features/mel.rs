//! Log-mel spectrogram generation.
//!
//! Converts a fixed-length waveform into a `n_mels x frames` grid of decibel
//! values referenced to the loudest cell of that same grid, matching the
//! preprocessing the classifier was trained with.

use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::Array2;
use realfft::{RealFftPlanner, RealToComplex};
use tracing::debug;

use super::config::{MelConfig, PadMode};
use super::FeatureError;
use crate::audio::FixedLengthWaveform;

/// Log-mel spectrogram, `n_mels` rows by `frames` columns, in dB
#[derive(Debug, Clone, PartialEq)]
pub struct LogMelSpectrogram {
    values: Array2<f32>,
}

impl LogMelSpectrogram {
    pub fn new(values: Array2<f32>) -> Self {
        Self { values }
    }

    /// Number of mel bins (rows)
    pub fn n_mels(&self) -> usize {
        self.values.nrows()
    }

    /// Number of time frames (columns)
    pub fn n_frames(&self) -> usize {
        self.values.ncols()
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f32> {
        self.values
    }

    /// Largest value in the grid (0 dB for any extractor output)
    pub fn max_value(&self) -> f32 {
        self.values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }
}

/// One triangular mel filter, stored from its first non-zero FFT bin
#[derive(Debug, Clone)]
struct MelFilter {
    start_bin: usize,
    weights: Vec<f32>,
}

/// Mel spectrogram generator with pre-computed filterbank, window and FFT plan
///
/// The generator holds no per-call state, so one instance can be shared
/// between threads and produces bit-identical output for identical input.
pub struct LogMelExtractor {
    config: MelConfig,
    fft: Arc<dyn RealToComplex<f32>>,
    mel_filterbank: Vec<MelFilter>,
    window: Vec<f32>,
}

impl LogMelExtractor {
    /// Create a new generator with the given configuration
    pub fn new(config: MelConfig) -> Result<Self, FeatureError> {
        config.validate().map_err(FeatureError::Config)?;

        let window = padded_hann_window(config.win_length, config.n_fft);

        let mel_filterbank = create_mel_filterbank(
            config.n_mels,
            config.n_fft,
            config.sample_rate as f64,
            config.fmin as f64,
            config.fmax_hz() as f64,
        )
        .into_iter()
        .map(|filter| {
            let start_bin = filter.iter().position(|&w| w > 0.0).unwrap_or(0);
            let end_bin = filter
                .iter()
                .rposition(|&w| w > 0.0)
                .map_or(start_bin, |i| i + 1);
            MelFilter {
                start_bin,
                weights: filter[start_bin..end_bin].to_vec(),
            }
        })
        .collect();

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.n_fft);

        Ok(Self {
            config,
            fft,
            mel_filterbank,
            window,
        })
    }

    pub fn config(&self) -> &MelConfig {
        &self.config
    }

    /// Compute the log-mel spectrogram of a fixed-length waveform
    pub fn extract(&self, waveform: &FixedLengthWaveform) -> Result<LogMelSpectrogram, FeatureError> {
        if waveform.sample_rate() != self.config.sample_rate {
            return Err(FeatureError::Config(format!(
                "waveform is {} Hz but the extractor expects {} Hz",
                waveform.sample_rate(),
                self.config.sample_rate
            )));
        }
        self.compute(waveform.samples())
    }

    /// Compute the log-mel spectrogram of raw samples at the configured rate
    pub fn compute(&self, audio: &[f32]) -> Result<LogMelSpectrogram, FeatureError> {
        let power = self.mel_power(audio)?;
        let log_mel = power_to_db(&power, self.config.amin, self.config.top_db);

        debug!(
            "Log-mel spectrogram: {} mels x {} frames from {} samples",
            log_mel.nrows(),
            log_mel.ncols(),
            audio.len()
        );

        Ok(LogMelSpectrogram::new(log_mel))
    }

    /// Mel-scaled power spectrogram (`n_mels x frames`) before dB conversion
    pub fn mel_power(&self, audio: &[f32]) -> Result<Array2<f32>, FeatureError> {
        let n_fft = self.config.n_fft;
        let hop = self.config.hop_length;

        let signal = if self.config.center {
            pad_signal(audio, n_fft / 2, self.config.pad_mode)?
        } else {
            audio.to_vec()
        };

        let n_frames = self.config.n_frames(audio.len());
        if n_frames == 0 {
            return Err(FeatureError::InvalidInput(format!(
                "{} samples is shorter than one {}-sample frame",
                audio.len(),
                n_fft
            )));
        }

        let mut fft_input = self.fft.make_input_vec();
        let mut fft_output = self.fft.make_output_vec();
        let mut scratch = self.fft.make_scratch_vec();
        let mut power_spec = vec![0.0f32; self.config.n_freqs()];

        let mut mel_spec = Array2::<f32>::zeros((self.config.n_mels, n_frames));

        for frame_idx in 0..n_frames {
            let start = frame_idx * hop;
            let frame = &signal[start..start + n_fft];

            for ((dst, &sample), &w) in fft_input.iter_mut().zip(frame).zip(&self.window) {
                *dst = sample * w;
            }

            self.fft
                .process_with_scratch(&mut fft_input, &mut fft_output, &mut scratch)
                .map_err(|e| FeatureError::Fft(e.to_string()))?;

            for (p, c) in power_spec.iter_mut().zip(&fft_output) {
                *p = c.re * c.re + c.im * c.im;
            }

            for (mel_idx, filter) in self.mel_filterbank.iter().enumerate() {
                let bins = &power_spec[filter.start_bin..filter.start_bin + filter.weights.len()];
                let energy: f32 = filter.weights.iter().zip(bins).map(|(w, p)| w * p).sum();
                mel_spec[[mel_idx, frame_idx]] = energy;
            }
        }

        Ok(mel_spec)
    }
}

/// Convert a power spectrogram to dB relative to its own maximum
///
/// `10*log10(max(amin, S)) - 10*log10(max(amin, max(S)))`, then values more
/// than `top_db` below the peak are raised to `peak - top_db`.
pub fn power_to_db(power: &Array2<f32>, amin: f32, top_db: Option<f32>) -> Array2<f32> {
    let reference = power.iter().copied().fold(0.0f32, f32::max);
    let ref_db = 10.0 * amin.max(reference).log10();

    let mut log_spec = power.mapv(|p| 10.0 * amin.max(p).log10() - ref_db);

    if let Some(top_db) = top_db {
        let peak = log_spec.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = peak - top_db;
        log_spec.mapv_inplace(|v| v.max(floor));
    }

    log_spec
}

/// Extend the signal by `pad` samples on both sides
fn pad_signal(audio: &[f32], pad: usize, mode: PadMode) -> Result<Vec<f32>, FeatureError> {
    let mut padded = Vec::with_capacity(audio.len() + 2 * pad);

    match mode {
        PadMode::Constant => {
            padded.resize(pad, 0.0);
            padded.extend_from_slice(audio);
            padded.resize(audio.len() + 2 * pad, 0.0);
        }
        PadMode::Reflect => {
            if audio.is_empty() {
                return Err(FeatureError::InvalidInput(
                    "cannot reflect-pad an empty signal".to_string(),
                ));
            }
            let n = audio.len() as i64;
            let total = audio.len() + 2 * pad;
            for i in 0..total {
                let idx = reflect_index(i as i64 - pad as i64, n);
                padded.push(audio[idx]);
            }
        }
    }

    Ok(padded)
}

/// Map an out-of-range index into `0..n` by mirroring around the edge samples
fn reflect_index(i: i64, n: i64) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n - 1);
    let m = i.rem_euclid(period);
    (if m >= n { period - m } else { m }) as usize
}

/// Periodic Hann window of `win_length`, centered inside `n_fft` zeros
fn padded_hann_window(win_length: usize, n_fft: usize) -> Vec<f32> {
    let mut window = vec![0.0f32; n_fft];
    let offset = (n_fft - win_length) / 2;
    for i in 0..win_length {
        window[offset + i] = (0.5 - 0.5 * (2.0 * PI * i as f64 / win_length as f64).cos()) as f32;
    }
    window
}

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert frequency to the Slaney mel scale (linear below 1 kHz, log above)
fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert a Slaney mel value back to frequency
fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Create a Slaney-normalized mel filterbank matrix
///
/// # Arguments
/// * `n_mels` - Number of mel bands
/// * `n_fft` - FFT size; each filter covers `n_fft/2 + 1` bins
/// * `sample_rate` - Audio sample rate in Hz
/// * `fmin` - Lower edge of the first band
/// * `fmax` - Upper edge of the last band
///
/// # Returns
/// Vec of mel filters, each filter is a Vec of weights for FFT bins
fn create_mel_filterbank(
    n_mels: usize,
    n_fft: usize,
    sample_rate: f64,
    fmin: f64,
    fmax: f64,
) -> Vec<Vec<f32>> {
    let n_freqs = n_fft / 2 + 1;

    let fft_freqs: Vec<f64> = (0..n_freqs)
        .map(|k| k as f64 * sample_rate / n_fft as f64)
        .collect();

    // n_mels + 2 band edges, equally spaced on the mel scale
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    let hz_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|i| {
            let (left, center, right) = (hz_points[i], hz_points[i + 1], hz_points[i + 2]);
            let enorm = 2.0 / (right - left);

            fft_freqs
                .iter()
                .map(|&f| {
                    let rising = (f - left) / (center - left);
                    let falling = (right - f) / (right - center);
                    (rising.min(falling).max(0.0) * enorm) as f32
                })
                .collect()
        })
        .collect()
}
