//! Layered configuration loading
//!
//! Sources, lowest priority first:
//! 1. built-in defaults (`SpeechConfig` serde defaults)
//! 2. `spellbee.toml` in the working directory, or the `--config` file
//! 3. `SPELLBEE_*` environment variables (`SPELLBEE_GEMINI__API_KEY`)

use std::path::Path;

use speech_audio::SpeechConfig;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SPELLBEE";

/// Default config file name, without extension
pub const DEFAULT_FILE: &str = "spellbee";

/// Load configuration from file and process environment
///
/// # Errors
///
/// Returns an error if an explicitly given file is missing or any source
/// fails to parse.
pub fn load(path: Option<&Path>) -> Result<SpeechConfig, config::ConfigError> {
    load_with_env(path, None)
}

/// Load configuration with an explicit environment map
///
/// `None` reads the process environment.
pub fn load_with_env(
    path: Option<&Path>,
    env: Option<config::Map<String, String>>,
) -> Result<SpeechConfig, config::ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_FILE).required(false),
    };

    config::Config::builder()
        .add_source(file)
        // Override with environment variables (e.g., SPELLBEE_GEMINI__API_KEY)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()?
        .try_deserialize()
}
