//! Configuration for speech audio

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::types::{PcmSpec, VoiceId};

/// Largest accepted `headless_time_scale`
pub const MAX_HEADLESS_TIME_SCALE: f64 = 100.0;

/// Configuration for the speech audio service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Synthesis backend to use
    #[serde(default)]
    pub provider: SpeechProvider,

    /// Gemini backend settings
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// OpenAI-compatible backend settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Voice used when a caller does not pick one
    #[serde(default)]
    pub default_voice: VoiceId,

    /// Upper bound for one synthesis call in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Sample rate the output device is opened with
    #[serde(default = "default_output_sample_rate")]
    pub output_sample_rate: u32,

    /// Fallback narration speed relative to normal (1.0)
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: f32,

    /// Fallback narrator implementation
    #[serde(default)]
    pub narrator: NarratorKind,

    /// Audio output implementation
    #[serde(default)]
    pub audio_output: AudioOutputKind,

    /// Headless output: simulated playback time relative to buffer duration
    #[serde(default = "default_headless_time_scale")]
    pub headless_time_scale: f64,
}

/// Synthesis backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    /// Gemini TTS, raw PCM payloads
    #[default]
    Gemini,
    /// OpenAI-compatible `/audio/speech`, WAV payloads
    OpenAI,
}

/// Fallback narrator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NarratorKind {
    /// `spd-say` / `espeak-ng`
    #[default]
    System,
    /// Write the text to the log only
    Log,
}

/// Audio output selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioOutputKind {
    /// Simulated device, no sound
    #[default]
    Headless,
    /// Default system output via rodio (feature "rodio")
    Rodio,
}

/// Gemini TTS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key (prefer env var SPELLBEE_GEMINI__API_KEY)
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// API base URL
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// TTS model
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Instruction prepended to every text
    #[serde(default = "default_prompt_prefix")]
    pub prompt_prefix: String,

    /// Sample rate of the returned PCM
    #[serde(default = "default_pcm_sample_rate")]
    pub sample_rate: u32,

    /// Channel count of the returned PCM
    #[serde(default = "default_pcm_channels")]
    pub channels: u16,
}

/// OpenAI-compatible TTS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key
    #[serde(default, skip_serializing)]
    pub api_key: Option<SecretString>,

    /// API base URL (for custom endpoints)
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Text-to-speech model
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Speaking speed (0.25 to 4.0)
    #[serde(default = "default_speed")]
    pub speed: f32,
}

const fn default_timeout_ms() -> u64 {
    30000 // 30 seconds
}

const fn default_output_sample_rate() -> u32 {
    24000
}

const fn default_fallback_rate() -> f32 {
    0.8
}

const fn default_headless_time_scale() -> f64 {
    1.0
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_prompt_prefix() -> String {
    "Say clearly: ".to_string()
}

const fn default_pcm_sample_rate() -> u32 {
    24000
}

const fn default_pcm_channels() -> u16 {
    1
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "tts-1".to_string()
}

const fn default_speed() -> f32 {
    1.0
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            prompt_prefix: default_prompt_prefix(),
            sample_rate: default_pcm_sample_rate(),
            channels: default_pcm_channels(),
        }
    }
}

impl GeminiConfig {
    /// PCM layout the Gemini backend returns
    #[must_use]
    pub const fn pcm_spec(&self) -> PcmSpec {
        PcmSpec::new(self.sample_rate, self.channels)
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            speed: default_speed(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: SpeechProvider::default(),
            gemini: GeminiConfig::default(),
            openai: OpenAIConfig::default(),
            default_voice: VoiceId::default(),
            timeout_ms: default_timeout_ms(),
            output_sample_rate: default_output_sample_rate(),
            fallback_rate: default_fallback_rate(),
            narrator: NarratorKind::default(),
            audio_output: AudioOutputKind::default(),
            headless_time_scale: default_headless_time_scale(),
        }
    }
}

impl SpeechConfig {
    /// Create a minimal config for testing
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            gemini: GeminiConfig {
                api_key: Some(SecretString::from("test-key")),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        match self.provider {
            SpeechProvider::Gemini => {
                if self.gemini.api_key.is_none() {
                    return Err("Gemini API key is required for Gemini provider".to_string());
                }
                if self.gemini.sample_rate == 0 {
                    return Err("Gemini PCM sample rate must be greater than 0".to_string());
                }
                if self.gemini.channels == 0 {
                    return Err("Gemini PCM channel count must be greater than 0".to_string());
                }
            },
            SpeechProvider::OpenAI => {
                if self.openai.api_key.is_none() {
                    return Err("OpenAI API key is required for OpenAI provider".to_string());
                }
                if !(0.25..=4.0).contains(&self.openai.speed) {
                    return Err(format!(
                        "Speed must be between 0.25 and 4.0, got {}",
                        self.openai.speed
                    ));
                }
            },
        }

        if self.timeout_ms == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        if self.output_sample_rate == 0 {
            return Err("Output sample rate must be greater than 0".to_string());
        }

        if !(0.1..=2.0).contains(&self.fallback_rate) {
            return Err(format!(
                "Fallback rate must be between 0.1 and 2.0, got {}",
                self.fallback_rate
            ));
        }

        if !(0.0..=MAX_HEADLESS_TIME_SCALE).contains(&self.headless_time_scale) {
            return Err(format!(
                "Headless time scale must be between 0 and {MAX_HEADLESS_TIME_SCALE}, got {}",
                self.headless_time_scale
            ));
        }

        Ok(())
    }
}
