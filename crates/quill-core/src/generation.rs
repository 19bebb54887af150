//! The text-generation capability consumed by content handlers.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// A finite, non-restartable sequence of non-empty text fragments.
///
/// The stream ends when the upstream source signals completion. An `Err`
/// item terminates it; consumers must not poll past the first error.
/// Dropping the stream releases the upstream connection.
pub type TextStream = BoxStream<'static, Result<String, GenerationError>>;

/// Failure of the text-generation backend.
///
/// Raw transport errors are flattened to strings so nothing backend-specific
/// leaks into domain events.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The backend did not finish within the configured bound.
    #[error("generation timed out after {} seconds", .0.as_secs_f64())]
    Timeout(Duration),

    /// The backend could not be reached or the connection dropped.
    #[error("generation backend unreachable: {0}")]
    Transport(String),

    /// The backend answered with a non-success status or an error body.
    #[error("generation backend returned {status}: {message}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Backend-supplied message.
        message: String,
    },

    /// The backend response could not be decoded.
    #[error("malformed generation response: {0}")]
    Decode(String),
}

/// AI text generation, buffered or incremental.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates the full completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` on timeout, transport or protocol failure.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Opens an incremental completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` if the stream cannot be opened. Failures
    /// after that surface as an `Err` item on the stream.
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream, GenerationError>;
}
