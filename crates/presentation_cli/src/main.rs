//! Spelling Bee voice CLI
//!
//! Command-line front end for trying out and warming the speech cache.

#![allow(clippy::print_stdout)]

mod settings;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use speech_audio::devices::backend_from_config;
use speech_audio::narrator::narrator_from_config;
use speech_audio::providers::synthesizer_from_config;
use speech_audio::{AudioService, SpeechConfig, VoiceId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Spelling Bee voice CLI
#[derive(Parser)]
#[command(name = "spellbee-voice")]
#[command(author, version, about = "Spelling Bee Kids speech tools", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: ./spellbee.toml if present)
    #[arg(short, long, env = "SPELLBEE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Speak a word or sentence
    Speak {
        /// Text to speak
        text: String,

        /// Voice to use (default from configuration)
        #[arg(long)]
        voice: Option<VoiceId>,
    },

    /// Fetch phrases into the cache and print cache statistics
    ///
    /// Example: spellbee-voice prefetch necessary separate rhythm
    Prefetch {
        /// Phrases to fetch
        #[arg(required = true)]
        texts: Vec<String>,

        /// Voice to use (default from configuration)
        #[arg(long)]
        voice: Option<VoiceId>,
    },

    /// List the voices the game uses
    Voices,

    /// Validate the configuration and print it with secrets removed
    CheckConfig,
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn build_service(config: &SpeechConfig) -> anyhow::Result<AudioService> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    Ok(AudioService::new(
        synthesizer_from_config(config)?,
        backend_from_config(config)?,
        narrator_from_config(config),
        config,
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = log_filter_from_verbosity(cli.verbose);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Speak { text, voice } => {
            let voice = voice.unwrap_or_else(|| config.default_voice.clone());
            let service = build_service(&config)?;

            println!("🔊 Speaking with {voice}: {text}");
            service.speak(&text, &voice).await?;
        },

        Commands::Prefetch { texts, voice } => {
            let voice = voice.unwrap_or_else(|| config.default_voice.clone());
            let service = build_service(&config)?;

            service
                .prefetch_all(texts.iter().map(|text| (text.as_str(), &voice)))
                .await;

            for text in &texts {
                let mark = if service.is_cached(text, &voice) { "✅" } else { "❌" };
                println!("{mark} {text}");
            }
            println!("{}", serde_json::to_string_pretty(&service.stats())?);
        },

        Commands::Voices => {
            for voice in VoiceId::known() {
                let marker = if voice == config.default_voice { " (default)" } else { "" };
                println!("{voice}{marker}");
            }
        },

        Commands::CheckConfig => {
            match config.validate() {
                Ok(()) => println!("✅ Configuration is valid"),
                Err(e) => println!("❌ Configuration is invalid: {e}"),
            }
            println!("\n{}", toml::to_string_pretty(&config)?);
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_verbosity_zero() {
        assert_eq!(log_filter_from_verbosity(0), "warn");
    }

    #[test]
    fn log_filter_verbosity_one() {
        assert_eq!(log_filter_from_verbosity(1), "info");
    }

    #[test]
    fn log_filter_verbosity_two() {
        assert_eq!(log_filter_from_verbosity(2), "debug");
    }

    #[test]
    fn log_filter_verbosity_three_or_more() {
        assert_eq!(log_filter_from_verbosity(3), "trace");
        assert_eq!(log_filter_from_verbosity(10), "trace");
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_speak_with_voice() {
        let cli = Cli::try_parse_from(["spellbee-voice", "speak", "necessary", "--voice", "Puck"])
            .unwrap();

        match cli.command {
            Commands::Speak { text, voice } => {
                assert_eq!(text, "necessary");
                assert_eq!(voice, Some(VoiceId::puck()));
            },
            _ => panic!("Expected Speak command"),
        }
    }

    #[test]
    fn parse_rejects_voice_with_separator() {
        let result = Cli::try_parse_from(["spellbee-voice", "speak", "cat", "--voice", "a:b"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_prefetch_many() {
        let cli =
            Cli::try_parse_from(["spellbee-voice", "-vv", "prefetch", "ant", "bee", "cat"]).unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Prefetch { texts, voice } => {
                assert_eq!(texts, ["ant", "bee", "cat"]);
                assert!(voice.is_none());
            },
            _ => panic!("Expected Prefetch command"),
        }
    }

    #[test]
    fn parse_prefetch_requires_text() {
        assert!(Cli::try_parse_from(["spellbee-voice", "prefetch"]).is_err());
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::try_parse_from(["spellbee-voice", "--config", "/etc/spellbee.toml", "voices"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/spellbee.toml")));
        assert!(matches!(cli.command, Commands::Voices));
    }

    #[test]
    fn build_service_rejects_invalid_config() {
        assert!(build_service(&SpeechConfig::default()).is_err());
    }
}
