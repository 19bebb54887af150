//! Incremental generation: chunks flow to the caller while the generator
//! runs, and the outcome is recorded once the stream ends.
//!
//! The request event is appended before any chunk is produced. A spawned
//! task then forwards chunks over a bounded channel and, when the generator
//! finishes, fails, or the receiver goes away, appends exactly one terminal
//! event. The channel closes only after that append.

use std::sync::Arc;

use futures::StreamExt;
use quill_core::clock::Clock;
use quill_core::error::DomainError;
use quill_core::generation::{TextGenerator, TextStream};
use quill_core::store::EventStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::application::command_handlers::append_one;
use crate::domain::commands::StreamContent;
use crate::domain::events::{
    ContentEvent, ContentEventKind, GenerationCompleted, GenerationFailed, GenerationRequested,
};

/// Failure reason recorded when the consumer disconnects mid-stream.
pub const CANCELLED_REASON: &str = "generation cancelled: client disconnected";

const CHUNK_BUFFER: usize = 32;

/// How a streaming generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The generator finished; the full text was recorded.
    Completed {
        /// Concatenation of every forwarded chunk.
        generated_content: String,
    },
    /// The generator failed; the reason was recorded.
    Failed {
        /// Why generation failed.
        reason: String,
    },
    /// The consumer went away; recorded as a failure.
    Cancelled,
}

/// A running streaming generation.
#[derive(Debug)]
pub struct GenerationStream {
    /// Id of the generation, known before the first chunk.
    pub aggregate_id: Uuid,
    /// Text chunks in generation order. Dropping this cancels generation.
    pub chunks: mpsc::Receiver<String>,
    /// Resolves after the terminal event has been appended.
    pub completion: JoinHandle<Result<StreamOutcome, DomainError>>,
}

/// Starts a streaming generation for `command`.
///
/// # Errors
///
/// Returns `DomainError` if the request event cannot be appended; nothing
/// is spawned in that case.
pub async fn start_streaming_generation(
    command: &StreamContent,
    clock: Arc<dyn Clock>,
    store: Arc<dyn EventStore>,
    generator: Arc<dyn TextGenerator>,
) -> Result<GenerationStream, DomainError> {
    let aggregate_id = Uuid::new_v4();
    let requested = ContentEvent::new(
        aggregate_id,
        ContentEventKind::GenerationRequested(GenerationRequested {
            prompt: command.prompt.clone(),
        }),
        clock.as_ref(),
    );
    append_one(store.as_ref(), &requested).await?;

    let (tx, rx) = mpsc::channel(CHUNK_BUFFER);
    let span = info_span!(
        "stream_generation",
        correlation_id = %command.correlation_id,
        %aggregate_id
    );
    let run = StreamRun {
        aggregate_id,
        prompt: command.prompt.clone(),
        clock,
        store,
        generator,
    };
    let completion = tokio::spawn(
        async move {
            let result = run.drive(tx).await;
            if let Err(err) = &result {
                error!(error = %err, "failed to record stream outcome");
            }
            result
        }
        .instrument(span),
    );

    Ok(GenerationStream {
        aggregate_id,
        chunks: rx,
        completion,
    })
}

struct StreamRun {
    aggregate_id: Uuid,
    prompt: String,
    clock: Arc<dyn Clock>,
    store: Arc<dyn EventStore>,
    generator: Arc<dyn TextGenerator>,
}

impl StreamRun {
    async fn drive(self, tx: mpsc::Sender<String>) -> Result<StreamOutcome, DomainError> {
        let opened = tokio::select! {
            () = tx.closed() => None,
            opened = self.generator.generate_stream(&self.prompt) => Some(opened),
        };
        let outcome = match opened {
            None => StreamOutcome::Cancelled,
            Some(Ok(chunks)) => forward(chunks, &tx).await,
            Some(Err(err)) => StreamOutcome::Failed {
                reason: err.to_string(),
            },
        };

        let kind = match &outcome {
            StreamOutcome::Completed { generated_content } => {
                info!(chars = generated_content.len(), "stream completed");
                ContentEventKind::GenerationCompleted(GenerationCompleted {
                    prompt: self.prompt.clone(),
                    generated_content: generated_content.clone(),
                })
            }
            StreamOutcome::Failed { reason } => {
                warn!(%reason, "stream failed");
                ContentEventKind::GenerationFailed(GenerationFailed {
                    prompt: self.prompt.clone(),
                    reason: reason.clone(),
                })
            }
            StreamOutcome::Cancelled => {
                info!("stream cancelled by consumer");
                ContentEventKind::GenerationFailed(GenerationFailed {
                    prompt: self.prompt.clone(),
                    reason: CANCELLED_REASON.to_owned(),
                })
            }
        };
        let terminal = ContentEvent::new(self.aggregate_id, kind, self.clock.as_ref());
        append_one(self.store.as_ref(), &terminal).await?;

        // `tx` is dropped on return, after the terminal event is stored.
        drop(tx);
        Ok(outcome)
    }
}

/// Pumps `chunks` into `tx` until the stream ends, errors, or the receiver
/// is dropped. The upstream stream is dropped before returning.
async fn forward(mut chunks: TextStream, tx: &mpsc::Sender<String>) -> StreamOutcome {
    let mut generated_content = String::new();
    loop {
        tokio::select! {
            () = tx.closed() => return StreamOutcome::Cancelled,
            next = chunks.next() => match next {
                Some(Ok(chunk)) => {
                    generated_content.push_str(&chunk);
                    if tx.send(chunk).await.is_err() {
                        return StreamOutcome::Cancelled;
                    }
                }
                Some(Err(err)) => {
                    return StreamOutcome::Failed {
                        reason: err.to_string(),
                    };
                }
                None => return StreamOutcome::Completed { generated_content },
            },
        }
    }
}
