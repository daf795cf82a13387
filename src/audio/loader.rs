//! Audio source decoding.
//!
//! WAV sources go through `hound`; anything else (FLAC, MP3, OGG, AAC, ...)
//! is probed and decoded with `symphonia`. Decoded audio is downmixed to mono
//! and resampled to the canonical rate before it is handed on.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::{downmix_to_mono, resample, AudioError, CANONICAL_SAMPLE_RATE};

/// Mono waveform with its sample rate attached
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    /// Mono samples, nominally in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Convert to another sample rate (no-op when the rate already matches)
    pub fn resampled(self, target_rate: u32) -> Result<Self, AudioError> {
        if self.sample_rate == target_rate {
            return Ok(self);
        }
        let samples = resample(&self.samples, self.sample_rate, target_rate)?;
        Ok(Self::new(samples, target_rate))
    }
}

/// Decoded audio before channel and rate conversion
struct DecodedAudio {
    interleaved: Vec<f32>,
    sample_rate: u32,
    channels: usize,
}

/// Load an audio file as mono at the canonical sample rate
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Waveform, AudioError> {
    load_file_at(path, CANONICAL_SAMPLE_RATE)
}

/// Load an audio file as mono at `target_rate`
pub fn load_file_at<P: AsRef<Path>>(path: P, target_rate: u32) -> Result<Waveform, AudioError> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|e| AudioError::Decode(format!("cannot read {}: {}", path.display(), e)))?;

    let hint = path.extension().and_then(|e| e.to_str());
    let waveform = load_owned(data, hint, target_rate)?;

    debug!(
        "Loaded {}: {} samples ({:.2}s at {} Hz)",
        path.display(),
        waveform.len(),
        waveform.duration_secs(),
        waveform.sample_rate
    );

    Ok(waveform)
}

/// Load audio from an in-memory encoded byte stream
///
/// `format_hint` is an optional file extension such as `"mp3"`; WAV data is
/// recognised from its header regardless of the hint.
pub fn load_bytes(data: &[u8], format_hint: Option<&str>) -> Result<Waveform, AudioError> {
    load_bytes_at(data, format_hint, CANONICAL_SAMPLE_RATE)
}

/// Load audio from an in-memory encoded byte stream as mono at `target_rate`
pub fn load_bytes_at(
    data: &[u8],
    format_hint: Option<&str>,
    target_rate: u32,
) -> Result<Waveform, AudioError> {
    load_owned(data.to_vec(), format_hint, target_rate)
}

fn load_owned(
    data: Vec<u8>,
    format_hint: Option<&str>,
    target_rate: u32,
) -> Result<Waveform, AudioError> {
    let decoded = if is_riff_wave(&data) {
        match decode_wav(&data) {
            Ok(decoded) => decoded,
            // Compressed WAV codecs (mu-law, A-law, ADPCM) are left to symphonia
            Err(wav_err) => {
                debug!("{}; retrying with symphonia", wav_err);
                decode_with_symphonia(data, Some("wav"))?
            }
        }
    } else {
        decode_with_symphonia(data, format_hint)?
    };

    if decoded.sample_rate == 0 {
        return Err(AudioError::Decode("source reports a 0 Hz sample rate".to_string()));
    }

    let mono = downmix_to_mono(&decoded.interleaved, decoded.channels);
    Waveform::new(mono, decoded.sample_rate).resampled(target_rate)
}

fn is_riff_wave(data: &[u8]) -> bool {
    data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE"
}

fn decode_wav(data: &[u8]) -> Result<DecodedAudio, AudioError> {
    let reader = WavReader::new(Cursor::new(data))
        .map_err(|e| AudioError::Decode(format!("invalid WAV data: {}", e)))?;

    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(AudioError::Decode("WAV header declares 0 channels".to_string()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AudioError::Decode(format!("WAV sample read failed: {}", e)))?,
        SampleFormat::Int => {
            let max_val = (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AudioError::Decode(format!("WAV sample read failed: {}", e)))?
        }
    };

    Ok(DecodedAudio {
        interleaved,
        sample_rate: spec.sample_rate,
        channels,
    })
}

fn decode_with_symphonia(
    data: Vec<u8>,
    format_hint: Option<&str>,
) -> Result<DecodedAudio, AudioError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = format_hint {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("unsupported audio format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| AudioError::Decode("no audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Decode("unknown sample rate".to_string()))?;
    let mut channels = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("no decoder for track: {}", e)))?;

    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(AudioError::Decode(format!("packet read failed: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Skipping corrupt audio packet: {}", e);
                continue;
            }
            Err(e) => {
                return Err(AudioError::Decode(format!("decode failed: {}", e)));
            }
        };

        let spec = *decoded.spec();
        if channels.is_none() {
            channels = Some(spec.channels.count());
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    let channels = channels
        .filter(|&c| c > 0)
        .ok_or_else(|| AudioError::Decode("unknown channel count".to_string()))?;

    Ok(DecodedAudio {
        interleaved,
        sample_rate,
        channels,
    })
}
