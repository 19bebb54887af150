//! An in-memory event store, useful for development and testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use quill_core::error::DomainError;
use quill_core::event::NewEvent;
use quill_core::projection::Projector;
use quill_core::store::{EventStore, StoredEvent};

/// Per-aggregate event streams, each ordered by version.
type StreamMap = HashMap<Uuid, Vec<StoredEvent>>;

/// An in-memory event store with a shared read-model context `C`.
///
/// Appends hold the stream lock and the read-model lock for their whole
/// duration. If a projector fails, the staged events are discarded and the
/// read model is restored from a copy taken just before the first event the
/// append projects. That copy is a full clone of `C`, so appends that project
/// cost time proportional to the read model's size; the store is meant for
/// development and tests, not large data sets.
pub struct InMemoryEventStore<C> {
    streams: Mutex<StreamMap>,
    read_model: Arc<Mutex<C>>,
    projectors: Vec<Arc<dyn Projector<C>>>,
}

impl<C> InMemoryEventStore<C>
where
    C: Clone + Send + 'static,
{
    /// Creates an empty store whose projectors write into `read_model`.
    #[must_use]
    pub fn new(read_model: Arc<Mutex<C>>) -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            read_model,
            projectors: Vec::new(),
        }
    }

    /// Registers a projector, invoked after each matching insert.
    #[must_use]
    pub fn with_projector(mut self, projector: Arc<dyn Projector<C>>) -> Self {
        self.projectors.push(projector);
        self
    }

    /// Returns a handle to the read-model context.
    #[must_use]
    pub fn read_model(&self) -> Arc<Mutex<C>> {
        Arc::clone(&self.read_model)
    }

    fn projects(&self, event_type: &str) -> bool {
        self.projectors.iter().any(|p| p.handles(event_type))
    }

    async fn project(&self, ctx: &mut C, event: &StoredEvent) -> Result<(), DomainError> {
        for projector in &self.projectors {
            if projector.handles(&event.event_type) {
                debug!(
                    projector = projector.name(),
                    event_type = %event.event_type,
                    version = event.version,
                    "projecting event"
                );
                projector.project(ctx, event).await?;
            }
        }
        Ok(())
    }
}

impl<C> Default for InMemoryEventStore<C>
where
    C: Clone + Default + Send + 'static,
{
    fn default() -> Self {
        Self::new(Arc::new(Mutex::new(C::default())))
    }
}

impl<C: Send> std::fmt::Debug for InMemoryEventStore<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEventStore")
            .field(
                "projectors",
                &self.projectors.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

fn next_version(streams: &StreamMap, staged: &[StoredEvent], aggregate_id: Uuid) -> i64 {
    staged
        .iter()
        .rev()
        .find(|e| e.aggregate_id == aggregate_id)
        .or_else(|| streams.get(&aggregate_id).and_then(|stream| stream.last()))
        .map_or(0, |e| e.version)
        + 1
}

#[async_trait]
impl<C> EventStore for InMemoryEventStore<C>
where
    C: Clone + Send + Sync + 'static,
{
    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn append(&self, events: &[NewEvent]) -> Result<Vec<StoredEvent>, DomainError> {
        let mut streams = self.streams.lock().await;
        let mut read_model = self.read_model.lock().await;
        let mut snapshot: Option<C> = None;

        let mut staged: Vec<StoredEvent> = Vec::with_capacity(events.len());
        for event in events {
            let version = next_version(&streams, &staged, event.aggregate_id);
            let stored = event.clone().into_stored(version);
            if snapshot.is_none() && self.projects(&stored.event_type) {
                snapshot = Some(read_model.clone());
            }
            if let Err(err) = self.project(&mut *read_model, &stored).await {
                if let Some(snapshot) = snapshot {
                    *read_model = snapshot;
                }
                return Err(err);
            }
            staged.push(stored);
        }

        for stored in &staged {
            streams
                .entry(stored.aggregate_id)
                .or_default()
                .push(stored.clone());
        }
        Ok(staged)
    }

    #[instrument(skip(self))]
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .streams
            .lock()
            .await
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default())
    }
}
