//! Port definitions for speech audio
//!
//! Defines the traits (ports) that synthesis backends, output devices and
//! fallback narrators must implement. [`AudioService`](crate::AudioService)
//! only ever talks to these traits, so tests can swap in fakes.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::oneshot;

use crate::error::{PlaybackError, SpeechError};
use crate::types::{AudioBuffer, PayloadFormat, VoiceId};

/// Fires once when a started buffer has finished playing
pub type PlaybackEnded = oneshot::Receiver<()>;

/// Port for speech synthesis backends
///
/// # Example
///
/// ```ignore
/// use speech_audio::{SpeechSynthesizer, VoiceId};
///
/// async fn fetch_word(
///     tts: &impl SpeechSynthesizer,
///     word: &str,
/// ) -> Result<bytes::Bytes, SpeechError> {
///     tts.synthesize(word, &VoiceId::kore()).await
/// }
/// ```
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with the given voice
    ///
    /// # Arguments
    ///
    /// * `text` - Non-empty text to speak
    /// * `voice` - Backend voice label
    ///
    /// # Returns
    ///
    /// Returns the raw response payload, shaped as [`Self::payload_format`]
    /// describes.
    ///
    /// # Errors
    ///
    /// Returns `SpeechError` on transport failures or non-success responses.
    async fn synthesize(&self, text: &str, voice: &VoiceId) -> Result<Bytes, SpeechError>;

    /// Decode contract for the payloads this backend returns
    fn payload_format(&self) -> PayloadFormat;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Lifecycle state of an output device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Opened but not producing sound (e.g. waiting for a user gesture)
    Suspended,
    /// Ready to play
    Running,
    /// Released; cannot be resumed
    Closed,
}

/// Port for opening the audio output
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Open the output device at the requested sample rate
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::DeviceUnavailable` if no device can be opened.
    async fn open(&self, sample_rate: u32) -> Result<Arc<dyn AudioDevice>, PlaybackError>;
}

/// An opened audio output
#[async_trait]
pub trait AudioDevice: Send + Sync {
    /// Current lifecycle state
    fn state(&self) -> DeviceState;

    /// Move a suspended device to `Running`
    async fn resume(&self) -> Result<(), PlaybackError>;

    /// Sample rate the device was opened with
    fn sample_rate(&self) -> u32;

    /// Start playing `buffer` from the beginning
    ///
    /// Every call creates an independent source; the buffer is only read.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError` if the device cannot accept the buffer.
    fn start(&self, buffer: Arc<AudioBuffer>) -> Result<PlaybackEnded, PlaybackError>;
}

/// Port for best-effort platform speech
#[cfg_attr(test, mockall::automock)]
pub trait Narrator: Send + Sync {
    /// Speak `text` at `rate` times normal speed without waiting for it
    fn say(&self, text: &str, rate: f32);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PcmSpec;

    struct FixedSynthesizer {
        payload: Bytes,
    }

    #[async_trait]
    impl SpeechSynthesizer for FixedSynthesizer {
        async fn synthesize(&self, text: &str, _voice: &VoiceId) -> Result<Bytes, SpeechError> {
            if text.is_empty() {
                return Err(SpeechError::SynthesisFailed("empty".to_string()));
            }
            Ok(self.payload.clone())
        }

        fn payload_format(&self) -> PayloadFormat {
            PayloadFormat::RawPcm(PcmSpec::new(24000, 1))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn synthesizer_returns_payload() {
        let tts = FixedSynthesizer {
            payload: Bytes::from_static(&[0, 0, 1, 0]),
        };

        let payload = tts.synthesize("cat", &VoiceId::kore()).await.unwrap();

        assert_eq!(payload.len(), 4);
        assert_eq!(tts.name(), "fixed");
    }

    #[test]
    fn narrator_mock_records_rate() {
        let mut narrator = MockNarrator::new();
        narrator
            .expect_say()
            .withf(|text, rate| text == "cat" && (*rate - 0.8).abs() < f32::EPSILON)
            .times(1)
            .return_const(());

        narrator.say("cat", 0.8);
    }
}
