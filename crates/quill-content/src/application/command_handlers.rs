//! Command handlers for the Content Generation context.
//!
//! Each handler mints events, appends them, and lets the event store's
//! projectors update the read model within the same append.

use std::sync::Arc;

use async_trait::async_trait;
use quill_core::bus::CommandHandler;
use quill_core::clock::Clock;
use quill_core::error::DomainError;
use quill_core::event::DomainEvent;
use quill_core::generation::TextGenerator;
use quill_core::store::EventStore;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::commands::{DeleteContent, GenerateContent};
use crate::domain::events::{
    ContentEvent, ContentEventKind, GenerationCompleted, GenerationDeleted, GenerationFailed,
    GenerationRequested,
};

/// Appends a single event.
pub(crate) async fn append_one(
    store: &dyn EventStore,
    event: &ContentEvent,
) -> Result<(), DomainError> {
    store.append(&[event.to_new_event()]).await?;
    Ok(())
}

/// Handles the `GenerateContent` command.
///
/// Records the request, waits for the generator, then records the outcome.
/// A generator failure is not an error here: it becomes a
/// `GenerationFailed` event and the aggregate id is still returned.
///
/// # Errors
///
/// Returns `DomainError` if either append fails.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id))]
pub async fn handle_generate_content(
    command: &GenerateContent,
    clock: &dyn Clock,
    store: &dyn EventStore,
    generator: &dyn TextGenerator,
) -> Result<Uuid, DomainError> {
    let aggregate_id = Uuid::new_v4();
    let prompt = command.prompt.clone();

    let requested = ContentEvent::new(
        aggregate_id,
        ContentEventKind::GenerationRequested(GenerationRequested {
            prompt: prompt.clone(),
        }),
        clock,
    );
    append_one(store, &requested).await?;

    let outcome = match generator.generate(&prompt).await {
        Ok(generated_content) => {
            info!(%aggregate_id, chars = generated_content.len(), "content generated");
            ContentEventKind::GenerationCompleted(GenerationCompleted {
                prompt,
                generated_content,
            })
        }
        Err(err) => {
            warn!(%aggregate_id, error = %err, "content generation failed");
            ContentEventKind::GenerationFailed(GenerationFailed {
                prompt,
                reason: err.to_string(),
            })
        }
    };
    append_one(store, &ContentEvent::new(aggregate_id, outcome, clock)).await?;

    Ok(aggregate_id)
}

/// Handles the `DeleteContent` command.
///
/// The aggregate's existence is not checked; deleting an unknown id still
/// records the event.
///
/// # Errors
///
/// Returns `DomainError` if the append fails.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id, aggregate_id = %command.aggregate_id))]
pub async fn handle_delete_content(
    command: &DeleteContent,
    clock: &dyn Clock,
    store: &dyn EventStore,
) -> Result<(), DomainError> {
    let deleted = ContentEvent::new(
        command.aggregate_id,
        ContentEventKind::GenerationDeleted(GenerationDeleted {}),
        clock,
    );
    append_one(store, &deleted).await?;
    info!("content deletion recorded");
    Ok(())
}

/// Bus adapter for [`handle_generate_content`].
pub struct GenerateContentHandler {
    clock: Arc<dyn Clock>,
    store: Arc<dyn EventStore>,
    generator: Arc<dyn TextGenerator>,
}

impl GenerateContentHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn EventStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            clock,
            store,
            generator,
        }
    }
}

#[async_trait]
impl CommandHandler<GenerateContent> for GenerateContentHandler {
    async fn handle(&self, command: GenerateContent) -> Result<Uuid, DomainError> {
        handle_generate_content(
            &command,
            self.clock.as_ref(),
            self.store.as_ref(),
            self.generator.as_ref(),
        )
        .await
    }
}

/// Bus adapter for [`handle_delete_content`].
pub struct DeleteContentHandler {
    clock: Arc<dyn Clock>,
    store: Arc<dyn EventStore>,
}

impl DeleteContentHandler {
    /// Creates the handler.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, store: Arc<dyn EventStore>) -> Self {
        Self { clock, store }
    }
}

#[async_trait]
impl CommandHandler<DeleteContent> for DeleteContentHandler {
    async fn handle(&self, command: DeleteContent) -> Result<(), DomainError> {
        handle_delete_content(&command, self.clock.as_ref(), self.store.as_ref()).await
    }
}
