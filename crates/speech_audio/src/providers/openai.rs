//! OpenAI Speech Provider
//!
//! Implements `SpeechSynthesizer` against an OpenAI-compatible
//! `/audio/speech` endpoint. Audio is always requested as WAV so the payload
//! carries its own sample rate and channel layout.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::OpenAIConfig;
use crate::error::SpeechError;
use crate::ports::SpeechSynthesizer;
use crate::types::{PayloadFormat, VoiceId};

/// OpenAI TTS has a 4096 character limit
const MAX_INPUT_CHARS: usize = 4096;

/// OpenAI-compatible speech synthesizer
#[derive(Debug, Clone)]
pub struct OpenAISpeechProvider {
    client: Client,
    timeout: Duration,
    config: OpenAIConfig,
}

impl OpenAISpeechProvider {
    /// Create a new OpenAI speech provider
    ///
    /// # Arguments
    ///
    /// * `config` - OpenAI backend configuration
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if no API key is set or the HTTP
    /// client cannot be built.
    pub fn new(config: OpenAIConfig, timeout: Duration) -> Result<Self, SpeechError> {
        if config.api_key.is_none() {
            return Err(SpeechError::Configuration(
                "OpenAI API key is required".to_string(),
            ));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            SpeechError::Configuration(format!("Failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            timeout,
            config,
        })
    }

    /// Get the API key
    fn api_key(&self) -> &str {
        self.config
            .api_key
            .as_ref()
            .map_or("", |key| key.expose_secret())
    }

    /// Build the TTS endpoint URL
    fn tts_url(&self) -> String {
        format!("{}/audio/speech", self.config.base_url)
    }
}

/// OpenAI TTS request body
#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f32>,
}

/// OpenAI API error response
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    code: Option<String>,
}

#[async_trait]
impl SpeechSynthesizer for OpenAISpeechProvider {
    #[instrument(skip(self, text), fields(text_len = text.len(), voice = %voice))]
    async fn synthesize(&self, text: &str, voice: &VoiceId) -> Result<Bytes, SpeechError> {
        debug!("Synthesizing speech with OpenAI TTS");

        if text.is_empty() {
            return Err(SpeechError::SynthesisFailed(
                "Text cannot be empty".to_string(),
            ));
        }

        if text.len() > MAX_INPUT_CHARS {
            return Err(SpeechError::SynthesisFailed(format!(
                "Text too long: {} characters exceeds {MAX_INPUT_CHARS} limit",
                text.len()
            )));
        }

        let request = TtsRequest {
            model: &self.config.model,
            input: text,
            voice: voice.as_str(),
            response_format: "wav",
            speed: if (self.config.speed - 1.0).abs() < f32::EPSILON {
                None
            } else {
                Some(self.config.speed)
            },
        };

        let response = self
            .client
            .post(self.tts_url())
            .bearer_auth(self.api_key())
            .json(&request)
            .send()
            .await
            .map_err(|e| SpeechError::from_request(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();

            if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_body) {
                return match api_error.error.code.as_deref() {
                    Some("rate_limit_exceeded") => Err(SpeechError::RateLimited),
                    Some("model_not_found") => {
                        Err(SpeechError::ModelNotAvailable(self.config.model.clone()))
                    },
                    Some("invalid_voice") => Err(SpeechError::VoiceNotFound(voice.to_string())),
                    _ => Err(SpeechError::SynthesisFailed(api_error.error.message)),
                };
            }

            return Err(SpeechError::SynthesisFailed(format!(
                "HTTP {status}: {error_body}"
            )));
        }

        let audio_bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::InvalidResponse(format!("Failed to read audio: {e}")))?;

        debug!(audio_size = audio_bytes.len(), "Speech synthesis complete");

        Ok(audio_bytes)
    }

    fn payload_format(&self) -> PayloadFormat {
        PayloadFormat::Wav
    }

    fn name(&self) -> &str {
        "openai"
    }
}
