//! Audio output implementations

pub mod headless;
#[cfg(feature = "rodio")]
pub mod rodio_output;

use std::sync::Arc;

use crate::config::{AudioOutputKind, SpeechConfig};
use crate::error::PlaybackError;
use crate::ports::AudioBackend;

/// Build the audio backend selected by the configuration
///
/// # Errors
///
/// Returns `PlaybackError::DeviceUnavailable` if `rodio` output is selected
/// but the crate was built without the `rodio` feature.
pub fn backend_from_config(config: &SpeechConfig) -> Result<Arc<dyn AudioBackend>, PlaybackError> {
    match config.audio_output {
        AudioOutputKind::Headless => Ok(Arc::new(headless::HeadlessAudioBackend::with_time_scale(
            config.headless_time_scale,
        ))),
        #[cfg(feature = "rodio")]
        AudioOutputKind::Rodio => Ok(Arc::new(rodio_output::RodioAudioBackend::new())),
        #[cfg(not(feature = "rodio"))]
        AudioOutputKind::Rodio => Err(PlaybackError::DeviceUnavailable(
            "built without the \"rodio\" feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_is_the_default() {
        assert!(backend_from_config(&SpeechConfig::default()).is_ok());
    }

    #[cfg(not(feature = "rodio"))]
    #[test]
    fn rodio_requires_feature() {
        let config = SpeechConfig {
            audio_output: AudioOutputKind::Rodio,
            ..Default::default()
        };
        assert!(matches!(
            backend_from_config(&config),
            Err(PlaybackError::DeviceUnavailable(_))
        ));
    }
}
