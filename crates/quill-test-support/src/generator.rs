//! Test generators: canned `TextGenerator` implementations for tests.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use quill_core::generation::{GenerationError, TextGenerator, TextStream};

/// Returns the same text for every prompt; streams it as one chunk.
#[derive(Debug, Clone)]
pub struct StubGenerator(pub String);

impl StubGenerator {
    /// Create a generator answering `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Ok(self.0.clone())
    }

    async fn generate_stream(&self, _prompt: &str) -> Result<TextStream, GenerationError> {
        Ok(stream::iter(vec![Ok(self.0.clone())]).boxed())
    }
}

/// Fails every call with the configured error.
#[derive(Debug, Clone)]
pub struct FailingGenerator(pub GenerationError);

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(self.0.clone())
    }

    async fn generate_stream(&self, _prompt: &str) -> Result<TextStream, GenerationError> {
        Err(self.0.clone())
    }
}

/// Streams a fixed list of chunks, optionally ending with an error.
///
/// `generate` returns the concatenation, or the error if one is configured.
#[derive(Debug, Clone)]
pub struct ChunkedGenerator {
    chunks: Vec<String>,
    error: Option<GenerationError>,
    pending: bool,
}

impl ChunkedGenerator {
    /// Create a generator that yields `chunks` and then ends cleanly.
    #[must_use]
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            error: None,
            pending: false,
        }
    }

    /// Ends the stream with `error` after the chunks.
    #[must_use]
    pub fn failing_with(mut self, error: GenerationError) -> Self {
        self.error = Some(error);
        self
    }

    /// Never ends the stream after the chunks, like a backend that stalls.
    #[must_use]
    pub fn then_stall(mut self) -> Self {
        self.pending = true;
        self
    }
}

#[async_trait]
impl TextGenerator for ChunkedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        match &self.error {
            Some(error) => Err(error.clone()),
            None => Ok(self.chunks.concat()),
        }
    }

    async fn generate_stream(&self, _prompt: &str) -> Result<TextStream, GenerationError> {
        let items: Vec<Result<String, GenerationError>> = self
            .chunks
            .iter()
            .cloned()
            .map(Ok)
            .chain(self.error.clone().map(Err))
            .collect();
        let head = stream::iter(items);
        if self.pending {
            Ok(head.chain(stream::pending()).boxed())
        } else {
            Ok(head.boxed())
        }
    }
}
