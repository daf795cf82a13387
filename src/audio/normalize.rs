//! Fixed-duration normalization.
//!
//! The classifier sees exactly `round(sample_rate * duration)` samples. Long
//! clips lose their tail, short clips get trailing silence. Nothing is ever
//! trimmed or padded at the head.

use super::Waveform;

/// Waveform whose length equals the target sample count
#[derive(Debug, Clone, PartialEq)]
pub struct FixedLengthWaveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl FixedLengthWaveform {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

/// Target sample count for a clip of `duration_secs` at `sample_rate`
pub fn expected_len(sample_rate: u32, duration_secs: f32) -> usize {
    (sample_rate as f64 * duration_secs as f64).round().max(0.0) as usize
}

/// Truncate or zero-pad `waveform` at the tail to exactly `duration_secs`
pub fn normalize_duration(waveform: Waveform, duration_secs: f32) -> FixedLengthWaveform {
    let target = expected_len(waveform.sample_rate, duration_secs);
    let Waveform {
        mut samples,
        sample_rate,
    } = waveform;

    // `resize` drops the excess tail or appends zeros, and is a no-op on equality
    samples.resize(target, 0.0);

    FixedLengthWaveform {
        samples,
        sample_rate,
    }
}
