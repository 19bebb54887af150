//! Ollama client settings.

use std::time::Duration;

/// Default generate endpoint of a local Ollama server.
pub const DEFAULT_URL: &str = "http://localhost:11434/api/generate";

/// Default model name.
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Instruction appended to every prompt.
pub const CONCISE_SUFFIX: &str = "\n\nIMPORTANT: Keep your response under 120 words. Be concise.";

/// Connection and generation settings for [`crate::OllamaGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaConfig {
    /// Full URL of the generate endpoint.
    pub url: String,
    /// Model to run.
    pub model: String,
    /// Bound on a whole buffered generation.
    pub timeout: Duration,
    /// Bound on a whole streaming generation.
    pub stream_timeout: Duration,
    /// Token cap sent as `options.num_predict` in buffered mode.
    pub num_predict: u32,
}

impl OllamaConfig {
    /// Settings for `url` and `model` with default timeouts.
    #[must_use]
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model: model.into(),
            ..Self::default()
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            timeout: Duration::from_secs(100),
            stream_timeout: Duration::from_secs(120),
            num_predict: 150,
        }
    }
}
