//! Domain event abstractions.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::DomainError;
use crate::store::StoredEvent;

/// Identity and timing fixed when a domain event is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl EventMetadata {
    /// Mints metadata for a brand-new event on `aggregate_id`.
    ///
    /// `occurred_at` is truncated to microseconds, the precision of a
    /// `TIMESTAMPTZ` column, so a stored event reloads unchanged.
    #[must_use]
    pub fn new(aggregate_id: Uuid, clock: &dyn Clock) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            occurred_at: clock.now().trunc_subsecs(6),
        }
    }
}

/// Trait that all domain events implement.
///
/// `to_payload` and `from_payload` must round-trip: decoding the payload of
/// an event with its own `event_type` and metadata yields an equal event.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type discriminator stored alongside the payload.
    fn event_type(&self) -> &'static str;

    /// Returns the aggregate family this event belongs to.
    fn aggregate_type(&self) -> &'static str;

    /// Serializes the variant's own fields to a JSON object.
    fn to_payload(&self) -> serde_json::Value;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;

    /// Rebuilds an event from its discriminator, metadata and payload.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::UnknownEventType` if no variant claims
    /// `event_type`, or `DomainError::Infrastructure` if the payload does not
    /// match the variant's shape.
    fn from_payload(
        event_type: &str,
        metadata: EventMetadata,
        payload: &serde_json::Value,
    ) -> Result<Self, DomainError>
    where
        Self: Sized;

    /// Rebuilds an event from a stored record.
    ///
    /// # Errors
    ///
    /// See [`DomainEvent::from_payload`].
    fn from_stored(stored: &StoredEvent) -> Result<Self, DomainError>
    where
        Self: Sized,
    {
        Self::from_payload(
            &stored.event_type,
            EventMetadata {
                event_id: stored.event_id,
                aggregate_id: stored.aggregate_id,
                occurred_at: stored.occurred_at,
            },
            &stored.payload,
        )
    }

    /// Converts the event into an unversioned record ready for appending.
    fn to_new_event(&self) -> NewEvent {
        let meta = self.metadata();
        NewEvent {
            event_id: meta.event_id,
            aggregate_id: meta.aggregate_id,
            aggregate_type: self.aggregate_type().to_owned(),
            event_type: self.event_type().to_owned(),
            payload: self.to_payload(),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            occurred_at: meta.occurred_at,
        }
    }
}

/// An event record awaiting its version assignment by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Aggregate family name.
    pub aggregate_type: String,
    /// Event type discriminator.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Reserved; always an empty object today.
    pub metadata: serde_json::Value,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl NewEvent {
    /// Attaches the version assigned by the store.
    #[must_use]
    pub fn into_stored(self, version: i64) -> StoredEvent {
        StoredEvent {
            event_id: self.event_id,
            aggregate_id: self.aggregate_id,
            aggregate_type: self.aggregate_type,
            event_type: self.event_type,
            version,
            payload: self.payload,
            metadata: self.metadata,
            occurred_at: self.occurred_at,
        }
    }
}
