use rubato::{FftFixedIn, Resampler};
use tracing::debug;

use super::AudioError;

/// Input chunk size fed to the FFT resampler
const CHUNK_FRAMES: usize = 1024;

/// Offline mono resampler for whole utterances
///
/// Wraps an FFT resampler, compensates its output delay and trims the result
/// to `ceil(len * target / source)` samples so that a resampled clip lines up
/// with the original from its first sample.
pub struct AudioResampler {
    resampler: FftFixedIn<f32>,
    output_buffer: Vec<Vec<f32>>,
    source_rate: u32,
    target_rate: u32,
}

impl AudioResampler {
    /// Create a resampler from `source_rate` to `target_rate`
    pub fn new(source_rate: u32, target_rate: u32) -> Result<Self, AudioError> {
        if source_rate == 0 || target_rate == 0 {
            return Err(AudioError::Resample(format!(
                "invalid sample rates: {} Hz -> {} Hz",
                source_rate, target_rate
            )));
        }

        debug!(
            "Creating resampler: {} Hz -> {} Hz (ratio: {:.4})",
            source_rate,
            target_rate,
            target_rate as f64 / source_rate as f64
        );

        let resampler = FftFixedIn::new(
            source_rate as usize,
            target_rate as usize,
            CHUNK_FRAMES,
            2, // sub_chunks for quality
            1, // mono
        )
        .map_err(|e| AudioError::Resample(format!("failed to create resampler: {}", e)))?;

        let output_buffer = resampler.output_buffer_allocate(true);

        Ok(Self {
            resampler,
            output_buffer,
            source_rate,
            target_rate,
        })
    }

    /// Number of output samples produced for `input_len` input samples
    pub fn output_len(&self, input_len: usize) -> usize {
        (input_len as u64 * self.target_rate as u64).div_ceil(self.source_rate as u64) as usize
    }

    /// Resample a complete mono signal
    pub fn process_all(&mut self, input: &[f32]) -> Result<Vec<f32>, AudioError> {
        let expected = self.output_len(input.len());
        if expected == 0 {
            return Ok(Vec::new());
        }

        let delay = self.resampler.output_delay();
        let mut output = Vec::with_capacity(expected + delay + self.output_buffer[0].len());

        let mut chunks = input.chunks_exact(CHUNK_FRAMES);
        for chunk in &mut chunks {
            let (_, frames) = self
                .resampler
                .process_into_buffer(&[chunk], &mut self.output_buffer, None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            output.extend_from_slice(&self.output_buffer[0][..frames]);
        }

        let remainder = chunks.remainder();
        if !remainder.is_empty() {
            let tail = [remainder];
            let (_, frames) = self
                .resampler
                .process_partial_into_buffer(Some(&tail[..]), &mut self.output_buffer, None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            output.extend_from_slice(&self.output_buffer[0][..frames]);
        }

        // Drain the resampler's internal latency
        while output.len() < expected + delay {
            let (_, frames) = self
                .resampler
                .process_partial_into_buffer(None::<&[&[f32]]>, &mut self.output_buffer, None)
                .map_err(|e| AudioError::Resample(e.to_string()))?;
            if frames == 0 {
                break;
            }
            output.extend_from_slice(&self.output_buffer[0][..frames]);
        }

        output.drain(..delay.min(output.len()));
        output.resize(expected, 0.0);
        Ok(output)
    }
}

/// Resample `samples` from `source_rate` to `target_rate`
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>, AudioError> {
    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    AudioResampler::new(source_rate, target_rate)?.process_all(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_resample_44100_to_22050_length() {
        let input = vec![0.0f32; 44100];
        let output = resample(&input, 44100, 22050).expect("Resampling failed");
        assert_eq!(output.len(), 22050);
    }

    #[test]
    fn test_resample_48k_to_22050_length_rounds_up() {
        let input = vec![0.0f32; 1001];
        let output = resample(&input, 48000, 22050).expect("Resampling failed");
        // ceil(1001 * 22050 / 48000) = ceil(459.83)
        assert_eq!(output.len(), 460);
    }

    #[test]
    fn test_resample_16k_upsamples() {
        let input = vec![0.0f32; 16000];
        let output = resample(&input, 16000, 22050).expect("Resampling failed");
        assert_eq!(output.len(), 22050);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let input = sine(440.0, 22050, 3000);
        let output = resample(&input, 22050, 22050).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_resample_empty_input() {
        let output = resample(&[], 44100, 22050).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_resample_preserves_tone_energy() {
        let input = sine(440.0, 44100, 44100);
        let output = resample(&input, 44100, 22050).unwrap();

        let rms = |s: &[f32]| (s.iter().map(|x| x * x).sum::<f32>() / s.len() as f32).sqrt();
        // Skip edges where the filter ramps in and out
        let inner = &output[2000..output.len() - 2000];
        let ratio = rms(inner) / rms(&input);
        assert!(
            (ratio - 1.0).abs() < 0.1,
            "440 Hz tone should pass through the resampler, ratio: {}",
            ratio
        );
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(matches!(
            AudioResampler::new(0, 22050),
            Err(AudioError::Resample(_))
        ));
    }
}
