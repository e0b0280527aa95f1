//! Synthesis request plus decode, with every failure reduced to `None`

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::decoder::AudioDecoder;
use crate::error::SpeechError;
use crate::ports::SpeechSynthesizer;
use crate::types::{AudioBuffer, VoiceId};

/// Fetches and decodes speech for one (text, voice) pair
pub struct SpeechFetcher {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    decoder: AudioDecoder,
    timeout: Duration,
}

impl std::fmt::Debug for SpeechFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechFetcher")
            .field("synthesizer", &self.synthesizer.name())
            .field("format", &self.decoder.format())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SpeechFetcher {
    /// The decode path follows the synthesizer's declared payload format
    #[must_use]
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, timeout: Duration) -> Self {
        let decoder = AudioDecoder::new(synthesizer.payload_format());
        Self {
            synthesizer,
            decoder,
            timeout,
        }
    }

    /// Fetch and decode, logging any failure
    #[instrument(skip(self, text), fields(provider = self.synthesizer.name(), voice = %voice, text_len = text.len()))]
    pub async fn fetch(&self, text: &str, voice: &VoiceId) -> Option<AudioBuffer> {
        match self.try_fetch(text, voice).await {
            Ok(buffer) => {
                debug!(
                    frames = buffer.frame_count(),
                    sample_rate = buffer.sample_rate(),
                    "Speech fetched"
                );
                Some(buffer)
            },
            Err(e) => {
                warn!(error = %e, "Speech fetch failed");
                None
            },
        }
    }

    /// Fetch and decode, returning the failure
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Timeout` when the synthesizer does not answer in
    /// time, the synthesizer's own error, or a decode error.
    pub async fn try_fetch(&self, text: &str, voice: &VoiceId) -> Result<AudioBuffer, SpeechError> {
        let payload = tokio::time::timeout(self.timeout, self.synthesizer.synthesize(text, voice))
            .await
            .map_err(|_| {
                SpeechError::Timeout(u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX))
            })??;

        self.decoder.decode(&payload)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::types::{PayloadFormat, PcmSpec};

    enum Reply {
        Payload(&'static [u8]),
        Fail,
        Hang,
    }

    struct StubSynthesizer {
        reply: Reply,
        format: PayloadFormat,
    }

    #[async_trait]
    impl SpeechSynthesizer for StubSynthesizer {
        async fn synthesize(&self, _text: &str, _voice: &VoiceId) -> Result<Bytes, SpeechError> {
            match self.reply {
                Reply::Payload(bytes) => Ok(Bytes::from_static(bytes)),
                Reply::Fail => Err(SpeechError::SynthesisFailed("HTTP 500".to_string())),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Bytes::new())
                },
            }
        }

        fn payload_format(&self) -> PayloadFormat {
            self.format
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn fetcher(reply: Reply, format: PayloadFormat) -> SpeechFetcher {
        SpeechFetcher::new(
            Arc::new(StubSynthesizer { reply, format }),
            Duration::from_millis(50),
        )
    }

    const MONO: PayloadFormat = PayloadFormat::RawPcm(PcmSpec::new(24000, 1));

    #[tokio::test]
    async fn decodes_pcm_payload() {
        let fetcher = fetcher(Reply::Payload(&[0x00, 0x40, 0x00, 0xC0]), MONO);

        let buffer = fetcher.fetch("cat", &VoiceId::kore()).await.unwrap();

        assert_eq!(buffer.frame_count(), 2);
        assert_eq!(buffer.channel(0).unwrap(), &[0.5, -0.5]);
    }

    #[tokio::test]
    async fn synthesis_error_becomes_none() {
        let fetcher = fetcher(Reply::Fail, MONO);
        assert!(fetcher.fetch("cat", &VoiceId::kore()).await.is_none());
    }

    #[tokio::test]
    async fn decode_error_becomes_none() {
        let fetcher = fetcher(Reply::Payload(&[0x01, 0x02, 0x03]), MONO);

        assert!(matches!(
            fetcher.try_fetch("cat", &VoiceId::kore()).await,
            Err(SpeechError::InvalidAudio(_))
        ));
        assert!(fetcher.fetch("cat", &VoiceId::kore()).await.is_none());
    }

    #[tokio::test]
    async fn wav_format_rejects_raw_pcm() {
        let fetcher = fetcher(Reply::Payload(&[0x00, 0x40]), PayloadFormat::Wav);
        assert!(fetcher.fetch("cat", &VoiceId::kore()).await.is_none());
    }

    #[tokio::test]
    async fn slow_synthesis_times_out() {
        let fetcher = fetcher(Reply::Hang, MONO);

        let result = fetcher.try_fetch("cat", &VoiceId::kore()).await;

        assert!(matches!(result, Err(SpeechError::Timeout(50))));
    }
}
