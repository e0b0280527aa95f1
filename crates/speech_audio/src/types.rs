//! Types for speech audio
//!
//! Voice identities, cache keys, payload contracts and decoded audio buffers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SpeechError;

/// Separator between voice and text in a [`CacheKey`]
pub const KEY_SEPARATOR: char = ':';

/// Backend-defined speaker persona
///
/// The label is passed to the synthesis backend as-is. The only rule enforced
/// here is the one cache keys depend on: non-empty and free of
/// [`KEY_SEPARATOR`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoiceId(String);

impl VoiceId {
    /// Voice used for the spelling words
    pub const KORE: &'static str = "Kore";
    /// Voice used for the example sentences
    pub const PUCK: &'static str = "Puck";
    /// Voice used for praise
    pub const ZEPHYR: &'static str = "Zephyr";

    /// Create a voice identifier
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::InvalidVoice` if the label is empty or contains
    /// the key separator.
    pub fn new(label: impl Into<String>) -> Result<Self, SpeechError> {
        let label = label.into();
        if label.is_empty() || label.contains(KEY_SEPARATOR) {
            return Err(SpeechError::InvalidVoice(label));
        }
        Ok(Self(label))
    }

    #[must_use]
    pub fn kore() -> Self {
        Self(Self::KORE.to_string())
    }

    #[must_use]
    pub fn puck() -> Self {
        Self(Self::PUCK.to_string())
    }

    #[must_use]
    pub fn zephyr() -> Self {
        Self(Self::ZEPHYR.to_string())
    }

    /// Voices the game ships with
    #[must_use]
    pub fn known() -> Vec<Self> {
        vec![Self::kore(), Self::puck(), Self::zephyr()]
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VoiceId {
    fn default() -> Self {
        Self::kore()
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for VoiceId {
    type Err = SpeechError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for VoiceId {
    type Error = SpeechError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VoiceId> for String {
    fn from(voice: VoiceId) -> Self {
        voice.0
    }
}

/// Identity of one synthesis request: `"{voice}:{text}"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn new(voice: &VoiceId, text: &str) -> Self {
        Self(format!("{voice}{KEY_SEPARATOR}{text}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters of a headerless 16-bit little-endian PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmSpec {
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
}

impl PcmSpec {
    #[must_use]
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Bytes occupied by one frame (one sample for every channel)
    #[must_use]
    pub const fn frame_bytes(&self) -> usize {
        2 * self.channels as usize
    }
}

/// Shape of the bytes a synthesis backend returns
///
/// Every backend declares exactly one; decoding with the wrong contract
/// produces noise rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayloadFormat {
    /// RIFF/WAV container carrying its own header
    Wav,
    /// Headerless 16-bit signed little-endian interleaved samples
    RawPcm(PcmSpec),
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wav => f.write_str("wav"),
            Self::RawPcm(spec) => write!(
                f,
                "pcm_s16le/{}Hz/{}ch",
                spec.sample_rate, spec.channels
            ),
        }
    }
}

/// Decoded, immutable PCM audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a buffer from per-channel sample arrays
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::InvalidAudio` if there are no channels, the
    /// sample rate is zero, or the channels differ in length.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, SpeechError> {
        if sample_rate == 0 {
            return Err(SpeechError::InvalidAudio(
                "Sample rate must be greater than 0".to_string(),
            ));
        }
        let Some(first) = channels.first() else {
            return Err(SpeechError::InvalidAudio(
                "Audio must have at least one channel".to_string(),
            ));
        };
        let frames = first.len();
        if channels.iter().any(|channel| channel.len() != frames) {
            return Err(SpeechError::InvalidAudio(
                "All channels must have the same length".to_string(),
            ));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Split interleaved samples into channels
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::InvalidAudio` if `channel_count` is zero or the
    /// sample count is not a multiple of it.
    pub fn from_interleaved(
        sample_rate: u32,
        channel_count: u16,
        samples: &[f32],
    ) -> Result<Self, SpeechError> {
        let count = usize::from(channel_count);
        if count == 0 {
            return Err(SpeechError::InvalidAudio(
                "Audio must have at least one channel".to_string(),
            ));
        }
        if samples.len() % count != 0 {
            return Err(SpeechError::InvalidAudio(format!(
                "{} samples do not divide into {count} channels",
                samples.len()
            )));
        }
        let frames = samples.len() / count;
        let mut channels = vec![Vec::with_capacity(frames); count];
        for frame in samples.chunks_exact(count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Frames per channel
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Samples of one channel, if it exists
    #[must_use]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Samples interleaved frame by frame
    #[must_use]
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frame_count() * self.channels.len());
        for frame in 0..self.frame_count() {
            out.extend(self.channels.iter().map(|channel| channel[frame]));
        }
        out
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / f64::from(self.sample_rate))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }
}
