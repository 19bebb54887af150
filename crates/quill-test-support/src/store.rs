//! Test event stores: mock `EventStore` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use quill_core::error::DomainError;
use quill_core::event::NewEvent;
use quill_core::store::{EventStore, StoredEvent};
use uuid::Uuid;

/// An event store that records every `append` batch and serves loads from
/// the seeded history plus everything appended since.
///
/// Versions are assigned like the real stores: per aggregate, starting
/// after the highest seeded version. Projectors are not modelled.
#[derive(Debug, Default)]
pub struct RecordingEventStore {
    events: Mutex<Vec<StoredEvent>>,
    appended: Mutex<Vec<Vec<NewEvent>>>,
}

impl RecordingEventStore {
    /// Create a recording store seeded with `existing` history.
    #[must_use]
    pub fn new(existing: Vec<StoredEvent>) -> Self {
        Self {
            events: Mutex::new(existing),
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns a snapshot of all `append` batches, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_batches(&self) -> Vec<Vec<NewEvent>> {
        self.appended.lock().unwrap().clone()
    }

    /// Returns all appended events flattened across batches.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<NewEvent> {
        self.appended.lock().unwrap().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn append(&self, events: &[NewEvent]) -> Result<Vec<StoredEvent>, DomainError> {
        let mut log = self.events.lock().unwrap();
        let mut stored = Vec::with_capacity(events.len());
        for event in events {
            let version = log
                .iter()
                .filter(|e| e.aggregate_id == event.aggregate_id)
                .map(|e| e.version)
                .max()
                .unwrap_or(0)
                + 1;
            let record = event.clone().into_stored(version);
            log.push(record.clone());
            stored.push(record);
        }
        self.appended.lock().unwrap().push(events.to_vec());
        Ok(stored)
    }

    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let mut events: Vec<StoredEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

#[async_trait]
impl EventStore for FailingEventStore {
    async fn append(&self, _events: &[NewEvent]) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }

    async fn load_events(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}
