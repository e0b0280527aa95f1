//! Gemini Speech Provider
//!
//! Implements `SpeechSynthesizer` with the Gemini `generateContent` API in
//! audio mode. The response carries base64 encoded, headerless 16-bit PCM
//! (24 kHz mono for the preview TTS models) inside the first candidate part.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose;
use bytes::Bytes;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::GeminiConfig;
use crate::error::SpeechError;
use crate::ports::SpeechSynthesizer;
use crate::types::{PayloadFormat, VoiceId};

/// Gemini TTS speech synthesizer
#[derive(Debug, Clone)]
pub struct GeminiSpeechProvider {
    client: Client,
    timeout: Duration,
    config: GeminiConfig,
}

impl GeminiSpeechProvider {
    /// Create a new Gemini speech provider
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::Configuration` if no API key is set or the HTTP
    /// client cannot be built.
    pub fn new(config: GeminiConfig, timeout: Duration) -> Result<Self, SpeechError> {
        if config.api_key.is_none() {
            return Err(SpeechError::Configuration(
                "Gemini API key is required".to_string(),
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

    fn api_key(&self) -> &str {
        self.config
            .api_key
            .as_ref()
            .map_or("", |key| key.expose_secret())
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        )
    }

    fn request_body(&self, text: &str, voice: &VoiceId) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [{ "text": format!("{}{text}", self.config.prompt_prefix) }]
            }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": voice.as_str() }
                    }
                }
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

impl GenerateResponse {
    /// Base64 audio of the first candidate's first part
    fn audio_data(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .inline_data
            .as_ref()
            .map(|inline| inline.data.as_str())
    }
}

/// Google API error response
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    status: Option<String>,
}

#[async_trait]
impl SpeechSynthesizer for GeminiSpeechProvider {
    #[instrument(skip(self, text), fields(text_len = text.len(), voice = %voice))]
    async fn synthesize(&self, text: &str, voice: &VoiceId) -> Result<Bytes, SpeechError> {
        debug!("Synthesizing speech with Gemini TTS");

        if text.is_empty() {
            return Err(SpeechError::SynthesisFailed(
                "Text cannot be empty".to_string(),
            ));
        }

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", self.api_key())
            .json(&self.request_body(text, voice))
            .send()
            .await
            .map_err(|e| SpeechError::from_request(&e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();

            if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_body) {
                return match api_error.error.status.as_deref() {
                    Some("RESOURCE_EXHAUSTED") => {
                        debug!(message = %api_error.error.message, "Gemini quota exhausted");
                        Err(SpeechError::RateLimited)
                    },
                    Some("NOT_FOUND") => {
                        Err(SpeechError::ModelNotAvailable(self.config.model.clone()))
                    },
                    _ => Err(SpeechError::SynthesisFailed(api_error.error.message)),
                };
            }

            return Err(SpeechError::SynthesisFailed(format!(
                "HTTP {status}: {error_body}"
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let encoded = body.audio_data().ok_or_else(|| {
            SpeechError::InvalidResponse("Response contains no audio data".to_string())
        })?;

        let audio = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| SpeechError::InvalidResponse(format!("Invalid base64 audio: {e}")))?;

        debug!(audio_size = audio.len(), "Speech synthesis complete");

        Ok(Bytes::from(audio))
    }

    fn payload_format(&self) -> PayloadFormat {
        PayloadFormat::RawPcm(self.config.pcm_spec())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
