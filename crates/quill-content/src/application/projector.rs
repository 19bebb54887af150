//! Keeps the `content_generations` read model in step with content events.

use std::str::FromStr;

use async_trait::async_trait;
use quill_core::error::DomainError;
use quill_core::event::DomainEvent;
use quill_core::projection::Projector;
use quill_core::store::StoredEvent;
use tracing::warn;

use crate::domain::events::{
    ContentEvent, ContentEventKind, GENERATION_COMPLETED_EVENT_TYPE,
    GENERATION_DELETED_EVENT_TYPE, GENERATION_FAILED_EVENT_TYPE,
    GENERATION_REQUESTED_EVENT_TYPE,
};
use crate::domain::read_model::{ContentGeneration, ContentGenerationWriter};

/// What a `content.generation_deleted` event does to the read model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Leave the row in place; the deletion lives only in the event log.
    #[default]
    Retain,
    /// Remove the row.
    Remove,
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Ok(Self::Retain),
            "remove" => Ok(Self::Remove),
            other => Err(format!(
                "unknown delete policy {other:?}, expected \"retain\" or \"remove\""
            )),
        }
    }
}

/// Projects content events onto any [`ContentGenerationWriter`].
///
/// Runs inside the event store's append, so a failure here aborts the
/// append. Updates for a row that does not exist are logged and skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentGenerationProjector {
    delete_policy: DeletePolicy,
}

impl ContentGenerationProjector {
    /// Creates a projector applying `delete_policy` to deletions.
    #[must_use]
    pub fn new(delete_policy: DeletePolicy) -> Self {
        Self { delete_policy }
    }
}

#[async_trait]
impl<W> Projector<W> for ContentGenerationProjector
where
    W: ContentGenerationWriter + ?Sized,
{
    fn name(&self) -> &'static str {
        "content_generations"
    }

    fn handles(&self, event_type: &str) -> bool {
        match event_type {
            GENERATION_REQUESTED_EVENT_TYPE
            | GENERATION_COMPLETED_EVENT_TYPE
            | GENERATION_FAILED_EVENT_TYPE => true,
            GENERATION_DELETED_EVENT_TYPE => self.delete_policy == DeletePolicy::Remove,
            _ => false,
        }
    }

    async fn project(&self, ctx: &mut W, event: &StoredEvent) -> Result<(), DomainError> {
        let event = ContentEvent::from_stored(event)?;
        let aggregate_id = event.aggregate_id();
        let event_type = event.event_type();
        let at = event.metadata().occurred_at;

        let found = match event.kind {
            ContentEventKind::GenerationRequested(requested) => {
                ctx.insert(ContentGeneration::pending(aggregate_id, requested.prompt, at))
                    .await?;
                true
            }
            ContentEventKind::GenerationCompleted(completed) => {
                ctx.mark_completed(aggregate_id, &completed.generated_content, at)
                    .await?
            }
            ContentEventKind::GenerationFailed(failed) => {
                ctx.mark_failed(aggregate_id, &failed.reason, at).await?
            }
            ContentEventKind::GenerationDeleted(_) => {
                if self.delete_policy == DeletePolicy::Remove {
                    ctx.remove(aggregate_id).await?
                } else {
                    true
                }
            }
        };

        if !found {
            warn!(
                %aggregate_id,
                event_type,
                "no read model row to update"
            );
        }
        Ok(())
    }
}
