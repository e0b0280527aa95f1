//! Best-effort platform speech used when synthesis fails

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use crate::config::{NarratorKind, SpeechConfig};
use crate::ports::Narrator;

/// Narrates at a fixed, slightly slowed rate
#[derive(Clone)]
pub struct FallbackNarrator {
    narrator: Arc<dyn Narrator>,
    rate: f32,
}

impl std::fmt::Debug for FallbackNarrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackNarrator")
            .field("rate", &self.rate)
            .finish_non_exhaustive()
    }
}

impl FallbackNarrator {
    #[must_use]
    pub fn new(narrator: Arc<dyn Narrator>, rate: f32) -> Self {
        Self { narrator, rate }
    }

    #[must_use]
    pub const fn rate(&self) -> f32 {
        self.rate
    }

    /// Fire and forget
    pub fn say(&self, text: &str) {
        debug!(text_len = text.len(), rate = self.rate, "Falling back to narrator");
        self.narrator.say(text, self.rate);
    }
}

/// Command-line speech tools, tried in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechTool {
    /// speech-dispatcher client
    SpdSay,
    /// eSpeak NG
    EspeakNg,
}

impl SpeechTool {
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::SpdSay => "spd-say",
            Self::EspeakNg => "espeak-ng",
        }
    }

    /// Arguments speaking `text` at `rate` times normal speed
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn args(self, text: &str, rate: f32) -> Vec<String> {
        match self {
            // -100..=100, 0 is normal
            Self::SpdSay => {
                let value = ((rate - 1.0) * 100.0).round().clamp(-100.0, 100.0) as i32;
                vec![
                    "-r".to_string(),
                    value.to_string(),
                    "--".to_string(),
                    text.to_string(),
                ]
            },
            // words per minute, 175 is normal
            Self::EspeakNg => {
                let value = (rate * 175.0).round().clamp(80.0, 450.0) as i32;
                vec![
                    "-s".to_string(),
                    value.to_string(),
                    "--".to_string(),
                    text.to_string(),
                ]
            },
        }
    }
}

/// Speaks through `spd-say`, falling back to `espeak-ng`
#[derive(Debug, Clone)]
pub struct SystemNarrator {
    tools: Vec<SpeechTool>,
}

impl Default for SystemNarrator {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemNarrator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: vec![SpeechTool::SpdSay, SpeechTool::EspeakNg],
        }
    }

    #[must_use]
    pub fn with_tools(tools: Vec<SpeechTool>) -> Self {
        Self { tools }
    }
}

impl Narrator for SystemNarrator {
    fn say(&self, text: &str, rate: f32) {
        for tool in &self.tools {
            let spawned = Command::new(tool.program())
                .args(tool.args(text, rate))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();

            match spawned {
                Ok(mut child) => {
                    debug!(tool = tool.program(), "Narrating with system speech");
                    // Reap without blocking the caller
                    thread::spawn(move || {
                        let _ = child.wait();
                    });
                    return;
                },
                Err(e) => debug!(tool = tool.program(), error = %e, "Speech tool unavailable"),
            }
        }

        warn!(
            text_len = text.len(),
            "No system speech tool found (tried spd-say, espeak-ng)"
        );
    }
}

/// Writes the text to the log instead of speaking it
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNarrator;

impl Narrator for LogNarrator {
    fn say(&self, text: &str, rate: f32) {
        info!(text, rate, "Narrating");
    }
}

/// Build the narrator selected by the configuration
#[must_use]
pub fn narrator_from_config(config: &SpeechConfig) -> Arc<dyn Narrator> {
    match config.narrator {
        NarratorKind::System => Arc::new(SystemNarrator::new()),
        NarratorKind::Log => Arc::new(LogNarrator),
    }
}
