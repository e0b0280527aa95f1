//! Payload decoding for synthesized speech
//!
//! Turns the bytes a synthesis backend returns into an [`AudioBuffer`]. The
//! decode path is chosen by the backend's declared [`PayloadFormat`], never by
//! sniffing the payload.

use std::io::Cursor;

use tracing::{debug, instrument};

use crate::error::SpeechError;
use crate::types::{AudioBuffer, PayloadFormat, PcmSpec};

/// Full-scale divisor for signed 16-bit samples
const I16_SCALE: f32 = 32768.0;

/// Decoder bound to one payload contract
#[derive(Debug, Clone, Copy)]
pub struct AudioDecoder {
    format: PayloadFormat,
}

impl AudioDecoder {
    #[must_use]
    pub const fn new(format: PayloadFormat) -> Self {
        Self { format }
    }

    #[must_use]
    pub const fn format(&self) -> PayloadFormat {
        self.format
    }

    /// Decode a payload according to the configured contract
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::InvalidAudio` if the payload does not match the
    /// contract.
    #[instrument(skip(self, payload), fields(format = %self.format, bytes = payload.len()))]
    pub fn decode(&self, payload: &[u8]) -> Result<AudioBuffer, SpeechError> {
        let buffer = match self.format {
            PayloadFormat::Wav => decode_wav(payload)?,
            PayloadFormat::RawPcm(spec) => decode_pcm16le(payload, spec)?,
        };
        debug!(
            frames = buffer.frame_count(),
            channels = buffer.channel_count(),
            sample_rate = buffer.sample_rate(),
            "Decoded speech payload"
        );
        Ok(buffer)
    }
}

/// Decode headerless signed 16-bit little-endian interleaved PCM
///
/// Each sample is divided by 32768 so the full `i16` range maps onto
/// `[-1, 1)`.
///
/// # Errors
///
/// Returns `SpeechError::InvalidAudio` for an empty payload, a zero sample
/// rate or channel count, or a byte length that is not a whole number of
/// frames.
pub fn decode_pcm16le(payload: &[u8], spec: PcmSpec) -> Result<AudioBuffer, SpeechError> {
    if spec.channels == 0 {
        return Err(SpeechError::InvalidAudio(
            "PCM channel count must be greater than 0".to_string(),
        ));
    }
    if spec.sample_rate == 0 {
        return Err(SpeechError::InvalidAudio(
            "PCM sample rate must be greater than 0".to_string(),
        ));
    }
    if payload.is_empty() {
        return Err(SpeechError::InvalidAudio("PCM payload is empty".to_string()));
    }
    if payload.len() % spec.frame_bytes() != 0 {
        return Err(SpeechError::InvalidAudio(format!(
            "PCM payload of {} bytes is not a whole number of {}-byte frames",
            payload.len(),
            spec.frame_bytes()
        )));
    }

    let samples: Vec<f32> = payload
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / I16_SCALE)
        .collect();

    AudioBuffer::from_interleaved(spec.sample_rate, spec.channels, &samples)
}

/// Decode a RIFF/WAV container
///
/// Integer samples of any bit depth are scaled by `2^(bits - 1)`; float
/// samples are taken as-is.
///
/// # Errors
///
/// Returns `SpeechError::InvalidAudio` if the container is malformed or
/// holds no samples.
pub fn decode_wav(payload: &[u8]) -> Result<AudioBuffer, SpeechError> {
    let reader = hound::WavReader::new(Cursor::new(payload))
        .map_err(|e| SpeechError::InvalidAudio(format!("Malformed WAV payload: {e}")))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
        },
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>(),
    }
    .map_err(|e| SpeechError::InvalidAudio(format!("Truncated WAV payload: {e}")))?;

    if samples.is_empty() {
        return Err(SpeechError::InvalidAudio("WAV payload has no samples".to_string()));
    }

    AudioBuffer::from_interleaved(spec.sample_rate, spec.channels, &samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn wav_bytes(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for sample in samples {
                writer.write_sample(*sample).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn pcm_known_samples_decode_exactly() {
        let bytes = pcm_bytes(&[0, 16384, -16384, i16::MIN, i16::MAX]);
        let buffer = decode_pcm16le(&bytes, PcmSpec::new(24000, 1)).unwrap();

        let channel = buffer.channel(0).unwrap();
        assert_eq!(channel.len(), 5);
        assert!((channel[0] - 0.0).abs() < f32::EPSILON);
        assert!((channel[1] - 0.5).abs() < f32::EPSILON);
        assert!((channel[2] + 0.5).abs() < f32::EPSILON);
        assert!((channel[3] + 1.0).abs() < f32::EPSILON);
        assert!((channel[4] - 32767.0 / 32768.0).abs() < f32::EPSILON);
    }

    #[test]
    fn pcm_little_endian_byte_order() {
        // 0x0100 = 256
        let buffer = decode_pcm16le(&[0x00, 0x01], PcmSpec::new(8000, 1)).unwrap();
        let expected = 256.0 / 32768.0;
        assert!((buffer.channel(0).unwrap()[0] - expected).abs() < f32::EPSILON);
    }

    #[test]
    fn pcm_stereo_is_deinterleaved() {
        let bytes = pcm_bytes(&[100, -100, 200, -200]);
        let buffer = decode_pcm16le(&bytes, PcmSpec::new(24000, 2)).unwrap();

        assert_eq!(buffer.frame_count(), bytes.len() / 4);
        assert_eq!(buffer.channel(0).unwrap()[1], 200.0 / 32768.0);
        assert_eq!(buffer.channel(1).unwrap()[1], -200.0 / 32768.0);
    }

    #[test]
    fn pcm_keeps_sample_rate() {
        let buffer = decode_pcm16le(&pcm_bytes(&[1, 2]), PcmSpec::new(24000, 1)).unwrap();
        assert_eq!(buffer.sample_rate(), 24000);
    }

    #[test]
    fn pcm_rejects_odd_length() {
        let result = decode_pcm16le(&[0x00, 0x01, 0x02], PcmSpec::new(24000, 1));
        assert!(matches!(result, Err(SpeechError::InvalidAudio(_))));
    }

    #[test]
    fn pcm_rejects_partial_stereo_frame() {
        let result = decode_pcm16le(&pcm_bytes(&[1, 2, 3]), PcmSpec::new(24000, 2));
        assert!(result.is_err());
    }

    #[test]
    fn pcm_rejects_empty_payload() {
        assert!(decode_pcm16le(&[], PcmSpec::new(24000, 1)).is_err());
    }

    #[test]
    fn pcm_rejects_zero_channels() {
        assert!(decode_pcm16le(&[0, 0], PcmSpec::new(24000, 0)).is_err());
    }

    #[test]
    fn wav_16_bit_mono_decodes() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[0, 16384, -32768]);
        let buffer = decode_wav(&bytes).unwrap();

        assert_eq!(buffer.sample_rate(), 16000);
        assert_eq!(buffer.channel(0).unwrap(), &[0.0, 0.5, -1.0]);
    }

    #[test]
    fn wav_stereo_decodes() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[16384, -16384, 8192, -8192]);
        let buffer = decode_wav(&bytes).unwrap();

        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.channel(1).unwrap(), &[-0.5, -0.25]);
    }

    #[test]
    fn wav_rejects_garbage() {
        let result = decode_wav(b"definitely not a riff header");
        assert!(matches!(result, Err(SpeechError::InvalidAudio(_))));
    }

    #[test]
    fn decoder_dispatches_on_format() {
        let pcm = AudioDecoder::new(PayloadFormat::RawPcm(PcmSpec::new(24000, 1)));
        assert!(pcm.decode(&pcm_bytes(&[1, 2, 3])).is_ok());

        // Raw PCM is not a WAV container
        let wav = AudioDecoder::new(PayloadFormat::Wav);
        assert!(wav.decode(&pcm_bytes(&[1, 2, 3])).is_err());
    }
}
