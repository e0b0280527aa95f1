//! Speech Audio - synthesized speech for Spelling Bee Kids
//!
//! Fetches spoken words and sentences from a remote text-to-speech backend,
//! decodes them into PCM buffers, caches them per (voice, text) and plays
//! them on a lazily opened output device:
//! - `AudioService::prefetch` - warm the cache ahead of time
//! - `AudioService::speak` - play a phrase, fetching it if needed
//! - `AudioService::clear_cache` - forget everything
//!
//! Concurrent requests for the same phrase share a single backend call.
//! When no audio can be produced the phrase is handed to a platform
//! narrator instead, so the game never goes silent.
//!
//! # Architecture
//!
//! This crate follows the ports & adapters pattern:
//! - `ports` module defines the traits (ports)
//! - `providers` module contains the synthesis backends (adapters)
//! - `devices` and `narrator` modules contain output adapters
//!
//! # Supported Providers
//!
//! - Gemini TTS (raw 16-bit PCM)
//! - OpenAI-compatible `/audio/speech` (WAV)
//!
//! # Example
//!
//! ```ignore
//! use speech_audio::{AudioService, SpeechConfig, VoiceId};
//!
//! let config = SpeechConfig::default();
//! let service = AudioService::new(
//!     speech_audio::providers::synthesizer_from_config(&config)?,
//!     speech_audio::devices::backend_from_config(&config)?,
//!     speech_audio::narrator::narrator_from_config(&config),
//!     &config,
//! );
//!
//! service.prefetch("necessary", &VoiceId::kore()).await;
//! service.speak("necessary", &VoiceId::kore()).await?;
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod decoder;
pub mod devices;
pub mod error;
pub mod fetcher;
pub mod narrator;
pub mod playback;
pub mod ports;
pub mod providers;
pub mod service;
pub mod types;

pub use cache::CacheStats;
pub use config::SpeechConfig;
pub use devices::headless::HeadlessAudioBackend;
pub use error::{PlaybackError, SpeechError};
pub use narrator::{LogNarrator, SystemNarrator};
pub use ports::{AudioBackend, AudioDevice, DeviceState, Narrator, SpeechSynthesizer};
pub use providers::gemini::GeminiSpeechProvider;
pub use providers::openai::OpenAISpeechProvider;
pub use service::AudioService;
pub use types::{AudioBuffer, CacheKey, PayloadFormat, PcmSpec, VoiceId};
