//! Event store abstraction.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{DomainEvent, NewEvent};

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Aggregate family name.
    pub aggregate_type: String,
    /// Event type discriminator used to rebuild the concrete variant.
    pub event_type: String,
    /// Position within the aggregate stream, starting at 1 with no gaps.
    pub version: i64,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Reserved; always an empty object today.
    pub metadata: serde_json::Value,
    /// Timestamp of event creation.
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

/// Append-only event log with per-aggregate versioning.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends `events` in order as one atomic unit.
    ///
    /// Each event receives `max(version of its aggregate) + 1`. Registered
    /// projectors observe every inserted event before the unit commits; a
    /// projector failure aborts the whole append.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if another writer claimed a
    /// version first, or `DomainError::Infrastructure` if storage fails.
    async fn append(&self, events: &[NewEvent]) -> Result<Vec<StoredEvent>, DomainError>;

    /// Loads all events for a given aggregate, ordered by ascending version.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;
}

/// Loads an aggregate's history and rebuilds each concrete event.
///
/// # Errors
///
/// Returns `DomainError::UnknownEventType` if a stored discriminator is not
/// claimed by `E`, or any error from [`EventStore::load_events`].
pub async fn load_domain_events<E: DomainEvent>(
    store: &dyn EventStore,
    aggregate_id: Uuid,
) -> Result<Vec<E>, DomainError> {
    store
        .load_events(aggregate_id)
        .await?
        .iter()
        .map(E::from_stored)
        .collect()
}
