//! Speech synthesis and playback errors

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while producing speech audio
///
/// None of these reach callers of [`AudioService`](crate::AudioService):
/// the fetch path logs them and falls back to narration.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// Failed to connect to speech service
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request to speech service failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Invalid audio format or corrupted data
    #[error("Invalid audio: {0}")]
    InvalidAudio(String),

    /// Synthesis failed
    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Invalid response from service
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout during processing
    #[error("Speech processing timeout after {0}ms")]
    Timeout(u64),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Voice not found
    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    /// Voice identifier cannot be used as part of a cache key
    #[error("Invalid voice identifier: {0:?}")]
    InvalidVoice(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),
}

impl SpeechError {
    /// Map a transport error from a client configured with `timeout`
    pub fn from_request(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX))
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}

/// Errors raised by the audio output device
///
/// These are the only errors that propagate out of
/// [`AudioService::speak`](crate::AudioService::speak): without a device
/// there is no way to produce any audio at all.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The output device could not be opened
    #[error("Failed to open audio output: {0}")]
    DeviceUnavailable(String),

    /// A suspended device refused to resume
    #[error("Failed to resume audio output: {0}")]
    ResumeFailed(String),

    /// The device was closed and can no longer play
    #[error("Audio output is closed")]
    DeviceClosed,

    /// The device rejected a buffer
    #[error("Failed to start playback: {0}")]
    StartFailed(String),
}
