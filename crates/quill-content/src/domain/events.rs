//! Domain events for the Content Generation context.

use quill_core::clock::Clock;
use quill_core::error::DomainError;
use quill_core::event::{DomainEvent, EventMetadata};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Aggregate family name recorded on every content event.
pub const CONTENT_AGGREGATE_TYPE: &str = "ContentGeneration";

/// Discriminator for [`GenerationRequested`].
pub const GENERATION_REQUESTED_EVENT_TYPE: &str = "content.generation_requested";
/// Discriminator for [`GenerationCompleted`].
pub const GENERATION_COMPLETED_EVENT_TYPE: &str = "content.generation_completed";
/// Discriminator for [`GenerationFailed`].
pub const GENERATION_FAILED_EVENT_TYPE: &str = "content.generation_failed";
/// Discriminator for [`GenerationDeleted`].
pub const GENERATION_DELETED_EVENT_TYPE: &str = "content.generation_deleted";

/// Emitted when a user asks for content; always the first event of a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequested {
    /// The prompt as submitted.
    pub prompt: String,
}

/// Emitted when the AI backend produced the full text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationCompleted {
    /// The prompt, repeated so the event stands alone.
    pub prompt: String,
    /// The generated text.
    pub generated_content: String,
}

/// Emitted when generation failed or was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationFailed {
    /// The prompt, repeated so the event stands alone.
    pub prompt: String,
    /// Human-readable failure reason.
    pub reason: String,
}

/// Emitted when a user deletes a generation. Carries no fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GenerationDeleted {}

/// Event payload variants for the Content Generation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentEventKind {
    /// Content was requested.
    GenerationRequested(GenerationRequested),
    /// Content was generated.
    GenerationCompleted(GenerationCompleted),
    /// Generation failed.
    GenerationFailed(GenerationFailed),
    /// The generation was deleted.
    GenerationDeleted(GenerationDeleted),
}

/// Domain event envelope for the Content Generation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: ContentEventKind,
}

impl ContentEvent {
    /// Builds a fresh event for `aggregate_id`, stamped by `clock`.
    #[must_use]
    pub fn new(aggregate_id: Uuid, kind: ContentEventKind, clock: &dyn Clock) -> Self {
        Self {
            metadata: EventMetadata::new(aggregate_id, clock),
            kind,
        }
    }

    /// The aggregate this event belongs to.
    #[must_use]
    pub fn aggregate_id(&self) -> Uuid {
        self.metadata.aggregate_id
    }
}

fn decode<T: DeserializeOwned>(
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<T, DomainError> {
    T::deserialize(payload).map_err(|e| {
        DomainError::Infrastructure(format!("malformed {event_type} payload: {e}"))
    })
}

impl DomainEvent for ContentEvent {
    fn event_type(&self) -> &'static str {
        match &self.kind {
            ContentEventKind::GenerationRequested(_) => GENERATION_REQUESTED_EVENT_TYPE,
            ContentEventKind::GenerationCompleted(_) => GENERATION_COMPLETED_EVENT_TYPE,
            ContentEventKind::GenerationFailed(_) => GENERATION_FAILED_EVENT_TYPE,
            ContentEventKind::GenerationDeleted(_) => GENERATION_DELETED_EVENT_TYPE,
        }
    }

    fn aggregate_type(&self) -> &'static str {
        CONTENT_AGGREGATE_TYPE
    }

    fn to_payload(&self) -> serde_json::Value {
        match &self.kind {
            ContentEventKind::GenerationRequested(e) => serde_json::json!({
                "prompt": e.prompt,
            }),
            ContentEventKind::GenerationCompleted(e) => serde_json::json!({
                "prompt": e.prompt,
                "generated_content": e.generated_content,
            }),
            ContentEventKind::GenerationFailed(e) => serde_json::json!({
                "prompt": e.prompt,
                "reason": e.reason,
            }),
            ContentEventKind::GenerationDeleted(_) => serde_json::json!({}),
        }
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn from_payload(
        event_type: &str,
        metadata: EventMetadata,
        payload: &serde_json::Value,
    ) -> Result<Self, DomainError> {
        let kind = match event_type {
            GENERATION_REQUESTED_EVENT_TYPE => {
                ContentEventKind::GenerationRequested(decode(event_type, payload)?)
            }
            GENERATION_COMPLETED_EVENT_TYPE => {
                ContentEventKind::GenerationCompleted(decode(event_type, payload)?)
            }
            GENERATION_FAILED_EVENT_TYPE => {
                ContentEventKind::GenerationFailed(decode(event_type, payload)?)
            }
            GENERATION_DELETED_EVENT_TYPE => {
                ContentEventKind::GenerationDeleted(decode(event_type, payload)?)
            }
            other => return Err(DomainError::UnknownEventType(other.to_owned())),
        };
        Ok(Self { metadata, kind })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_test_support::FixedClock;

    fn event(kind: ContentEventKind) -> ContentEvent {
        ContentEvent::new(Uuid::new_v4(), kind, &FixedClock::standard())
    }

    fn round_trip(original: &ContentEvent) -> ContentEvent {
        ContentEvent::from_payload(
            original.event_type(),
            original.metadata,
            &original.to_payload(),
        )
        .unwrap()
    }

    #[test]
    fn test_every_variant_round_trips_through_its_payload() {
        let variants = [
            event(ContentEventKind::GenerationRequested(GenerationRequested {
                prompt: "Write a haiku about rust".to_owned(),
            })),
            event(ContentEventKind::GenerationCompleted(GenerationCompleted {
                prompt: "Write a haiku about rust".to_owned(),
                generated_content: "Iron slowly blooms".to_owned(),
            })),
            event(ContentEventKind::GenerationFailed(GenerationFailed {
                prompt: "Write a haiku about rust".to_owned(),
                reason: "generation timed out after 100 seconds".to_owned(),
            })),
            event(ContentEventKind::GenerationDeleted(GenerationDeleted {})),
        ];

        for original in &variants {
            assert_eq!(&round_trip(original), original);
        }
    }

    #[test]
    fn test_payload_holds_only_variant_fields() {
        let completed = event(ContentEventKind::GenerationCompleted(GenerationCompleted {
            prompt: "p".to_owned(),
            generated_content: "c".to_owned(),
        }));
        let deleted = event(ContentEventKind::GenerationDeleted(GenerationDeleted {}));

        assert_eq!(
            completed.to_payload(),
            serde_json::json!({ "prompt": "p", "generated_content": "c" })
        );
        assert_eq!(deleted.to_payload(), serde_json::json!({}));
    }

    #[test]
    fn test_event_type_and_aggregate_type_discriminators() {
        let requested = event(ContentEventKind::GenerationRequested(GenerationRequested {
            prompt: "p".to_owned(),
        }));

        assert_eq!(requested.event_type(), "content.generation_requested");
        assert_eq!(requested.aggregate_type(), "ContentGeneration");
    }

    #[test]
    fn test_to_new_event_copies_metadata_and_leaves_metadata_column_empty() {
        let requested = event(ContentEventKind::GenerationRequested(GenerationRequested {
            prompt: "p".to_owned(),
        }));

        let record = requested.to_new_event();

        assert_eq!(record.event_id, requested.metadata.event_id);
        assert_eq!(record.aggregate_id, requested.aggregate_id());
        assert_eq!(record.occurred_at, requested.metadata.occurred_at);
        assert_eq!(record.metadata, serde_json::json!({}));
    }

    #[test]
    fn test_unknown_event_type_is_rejected() {
        let meta = EventMetadata::new(Uuid::new_v4(), &FixedClock::standard());

        let result = ContentEvent::from_payload("content.generation_paused", meta, &serde_json::json!({}));

        match result {
            Err(DomainError::UnknownEventType(name)) => {
                assert_eq!(name, "content.generation_paused");
            }
            other => panic!("expected UnknownEventType, got {other:?}"),
        }
    }

    #[test]
    fn test_payload_missing_a_field_is_an_infrastructure_error() {
        let meta = EventMetadata::new(Uuid::new_v4(), &FixedClock::standard());

        let result = ContentEvent::from_payload(
            GENERATION_COMPLETED_EVENT_TYPE,
            meta,
            &serde_json::json!({ "prompt": "p" }),
        );

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
