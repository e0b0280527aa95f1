//! Speech synthesis provider implementations

pub mod gemini;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{SpeechConfig, SpeechProvider};
use crate::error::SpeechError;
use crate::ports::SpeechSynthesizer;

/// Build the synthesizer selected by the configuration
///
/// # Errors
///
/// Returns `SpeechError::Configuration` if the selected backend is not
/// configured.
pub fn synthesizer_from_config(
    config: &SpeechConfig,
) -> Result<Arc<dyn SpeechSynthesizer>, SpeechError> {
    let timeout = Duration::from_millis(config.timeout_ms);
    Ok(match config.provider {
        SpeechProvider::Gemini => Arc::new(gemini::GeminiSpeechProvider::new(
            config.gemini.clone(),
            timeout,
        )?),
        SpeechProvider::OpenAI => Arc::new(openai::OpenAISpeechProvider::new(
            config.openai.clone(),
            timeout,
        )?),
    })
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::types::PayloadFormat;

    #[test]
    fn builds_gemini_by_default() {
        let config = SpeechConfig {
            gemini: crate::config::GeminiConfig {
                api_key: Some(SecretString::from("k")),
                ..Default::default()
            },
            ..Default::default()
        };

        let synthesizer = synthesizer_from_config(&config).unwrap();
        assert_eq!(synthesizer.name(), "gemini");
        assert!(matches!(
            synthesizer.payload_format(),
            PayloadFormat::RawPcm(_)
        ));
    }

    #[test]
    fn builds_openai_when_selected() {
        let mut config = SpeechConfig::default();
        config.provider = SpeechProvider::OpenAI;
        config.openai.api_key = Some(SecretString::from("k"));

        let synthesizer = synthesizer_from_config(&config).unwrap();
        assert_eq!(synthesizer.payload_format(), PayloadFormat::Wav);
    }

    #[test]
    fn fails_without_key() {
        assert!(synthesizer_from_config(&SpeechConfig::default()).is_err());
    }
}
