//! [`TextGenerator`] backed by Ollama's generate endpoint.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use quill_core::generation::{GenerationError, TextGenerator, TextStream};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::{CONCISE_SUFFIX, OllamaConfig};
use crate::ndjson::{Frame, NdjsonDecoder};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Generates text with an Ollama model over HTTP.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaGenerator {
    /// Builds a generator for `config`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::Transport` if the HTTP client cannot be
    /// initialised.
    pub fn new(config: OllamaConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// The active settings.
    #[must_use]
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    async fn open(
        &self,
        prompt: &str,
        options: Option<GenerateOptions>,
        timeout: Duration,
    ) -> Result<TextStream, GenerationError> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt: format!("{prompt}{CONCISE_SUFFIX}"),
            stream: true,
            options,
        };

        let response = self
            .client
            .post(&self.config.url)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_reqwest_error(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            warn!(status = status.as_u16(), %message, "ollama rejected generate request");
            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .bytes_stream()
            .map_ok(|bytes| bytes.to_vec())
            .map_err(move |e| map_reqwest_error(&e, timeout))
            .boxed();
        Ok(decode_body(body, status.as_u16()))
    }
}

fn map_reqwest_error(err: &reqwest::Error, timeout: Duration) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout(timeout)
    } else if err.is_decode() {
        GenerationError::Decode(err.to_string())
    } else {
        GenerationError::Transport(err.to_string())
    }
}

type ByteStream = BoxStream<'static, Result<Vec<u8>, GenerationError>>;

struct DecodeState {
    body: ByteStream,
    decoder: NdjsonDecoder,
    ready: VecDeque<Result<String, GenerationError>>,
    finished: bool,
    status: u16,
}

impl DecodeState {
    /// Queues decoded frames; stops at the first terminal frame.
    fn absorb(&mut self, frames: Vec<Frame>) {
        for frame in frames {
            match frame {
                Frame::Text(text) => self.ready.push_back(Ok(text)),
                Frame::Done => {
                    self.finished = true;
                    return;
                }
                Frame::Failed(message) => {
                    self.fail(GenerationError::Upstream {
                        status: self.status,
                        message,
                    });
                    return;
                }
                Frame::Malformed(reason) => {
                    self.fail(GenerationError::Decode(reason));
                    return;
                }
            }
        }
    }

    fn fail(&mut self, err: GenerationError) {
        self.ready.push_back(Err(err));
        self.finished = true;
    }
}

/// Turns a raw NDJSON body into text chunks.
///
/// The stream ends after `done`, after the first error, or when the body
/// ends. Dropping it drops the response body and its connection.
fn decode_body(body: ByteStream, status: u16) -> TextStream {
    let state = DecodeState {
        body,
        decoder: NdjsonDecoder::default(),
        ready: VecDeque::new(),
        finished: false,
        status,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let frames = state.decoder.push(&bytes);
                    state.absorb(frames);
                }
                Some(Err(err)) => state.fail(err),
                None => {
                    let frames = state.decoder.finish();
                    state.absorb(frames);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let options = GenerateOptions {
            num_predict: self.config.num_predict,
        };
        let chunks = self.open(prompt, Some(options), self.config.timeout).await?;
        let text: String = chunks.try_collect::<Vec<String>>().await?.concat();
        debug!(chars = text.len(), "ollama generation finished");
        Ok(text)
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream, GenerationError> {
        self.open(prompt, None, self.config.stream_timeout).await
    }
}
