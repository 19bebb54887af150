//! Server configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::time::Duration;

use quill_content::application::projector::DeletePolicy;
use quill_ollama::OllamaConfig;
use quill_ollama::config::{DEFAULT_MODEL, DEFAULT_URL};

use crate::error::AppError;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL URL; `None` selects the in-memory backend.
    pub database_url: Option<String>,
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Ollama client settings.
    pub ollama: OllamaConfig,
    /// Read-model behaviour on deletion.
    pub delete_policy: DeletePolicy,
    /// OTLP collector endpoint; tracing export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };

        let delete_policy = match non_empty("QUILL_DELETE_POLICY") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("QUILL_DELETE_POLICY: {e}")))?,
            None => DeletePolicy::default(),
        };

        let mut ollama = OllamaConfig::new(
            non_empty("OLLAMA_URL").unwrap_or_else(|| DEFAULT_URL.to_owned()),
            non_empty("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        );
        if let Some(raw) = non_empty("OLLAMA_TIMEOUT_SECS") {
            let secs: u64 = raw.parse().map_err(|e| {
                AppError::Config(format!("OLLAMA_TIMEOUT_SECS must be a whole number: {e}"))
            })?;
            ollama.timeout = Duration::from_secs(secs);
        }

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port,
            ollama,
            delete_policy,
            otlp_endpoint: non_empty("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// The address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host` and `port` do not form a socket
    /// address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}
