//! Query handlers for the Content Generation context.
//!
//! Row queries read only the `content_generations` read model; the history
//! query reads the event store.

use std::sync::Arc;

use async_trait::async_trait;
use quill_core::bus::QueryHandler;
use quill_core::error::DomainError;
use quill_core::store::{EventStore, load_domain_events};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::events::ContentEvent;
use crate::domain::queries::{GetContentGeneration, GetContentGenerations, GetContentHistory};
use crate::domain::read_model::{ContentGeneration, ContentGenerationReader};

/// Fetches one generation row. An absent id yields `None`.
///
/// # Errors
///
/// Returns `DomainError` if the read model cannot be read.
#[instrument(skip(reader))]
pub async fn get_content_generation(
    aggregate_id: Option<Uuid>,
    reader: &dyn ContentGenerationReader,
) -> Result<Option<ContentGeneration>, DomainError> {
    match aggregate_id {
        Some(aggregate_id) => reader.find(aggregate_id).await,
        None => Ok(None),
    }
}

/// Lists every generation row, newest first.
///
/// # Errors
///
/// Returns `DomainError` if the read model cannot be read.
#[instrument(skip(reader))]
pub async fn list_content_generations(
    reader: &dyn ContentGenerationReader,
) -> Result<Vec<ContentGeneration>, DomainError> {
    reader.list_newest_first().await
}

/// Loads the typed event history of a generation, oldest first.
///
/// # Errors
///
/// Returns `DomainError::UnknownEventType` if the stream holds an event
/// this context does not know, or an infrastructure error.
#[instrument(skip(store))]
pub async fn get_content_history(
    aggregate_id: Uuid,
    store: &dyn EventStore,
) -> Result<Vec<ContentEvent>, DomainError> {
    load_domain_events(store, aggregate_id).await
}

/// Bus adapter for the row queries.
pub struct ContentGenerationQueries {
    reader: Arc<dyn ContentGenerationReader>,
}

impl ContentGenerationQueries {
    /// Creates the handler over `reader`.
    #[must_use]
    pub fn new(reader: Arc<dyn ContentGenerationReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl QueryHandler<GetContentGeneration> for ContentGenerationQueries {
    async fn handle(
        &self,
        query: GetContentGeneration,
    ) -> Result<Option<ContentGeneration>, DomainError> {
        get_content_generation(query.aggregate_id, self.reader.as_ref()).await
    }
}

#[async_trait]
impl QueryHandler<GetContentGenerations> for ContentGenerationQueries {
    async fn handle(
        &self,
        _query: GetContentGenerations,
    ) -> Result<Vec<ContentGeneration>, DomainError> {
        list_content_generations(self.reader.as_ref()).await
    }
}

/// Bus adapter for [`get_content_history`].
pub struct ContentHistoryQuery {
    store: Arc<dyn EventStore>,
}

impl ContentHistoryQuery {
    /// Creates the handler over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl QueryHandler<GetContentHistory> for ContentHistoryQuery {
    async fn handle(&self, query: GetContentHistory) -> Result<Vec<ContentEvent>, DomainError> {
        get_content_history(query.aggregate_id, self.store.as_ref()).await
    }
}
