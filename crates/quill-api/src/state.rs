//! Shared application state and backend wiring.

use std::sync::Arc;

use quill_content::application::projector::{ContentGenerationProjector, DeletePolicy};
use quill_content::application::{ContentServices, register_handlers};
use quill_content::infrastructure::{
    ContentGenerationTable, InMemoryContentGenerations, PgContentGenerations,
};
use quill_core::bus::{CommandBus, QueryBus};
use quill_core::clock::Clock;
use quill_core::generation::TextGenerator;
use quill_event_store::{InMemoryEventStore, PgEventStore};
use sqlx::PgPool;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Command routing table.
    pub commands: Arc<CommandBus>,
    /// Query routing table.
    pub queries: Arc<QueryBus>,
    /// Collaborators for the streaming path, which bypasses the buses.
    pub content: ContentServices,
}

impl AppState {
    /// Builds the buses over `content`.
    #[must_use]
    pub fn new(content: ContentServices) -> Self {
        let mut commands = CommandBus::new();
        let mut queries = QueryBus::new();
        register_handlers(&content, &mut commands, &mut queries);
        Self {
            commands: Arc::new(commands),
            queries: Arc::new(queries),
            content,
        }
    }

    /// State backed by PostgreSQL; the projector writes through each
    /// append's transaction.
    #[must_use]
    pub fn postgres(
        pool: PgPool,
        clock: Arc<dyn Clock>,
        generator: Arc<dyn TextGenerator>,
        delete_policy: DeletePolicy,
    ) -> Self {
        let store = PgEventStore::new(pool.clone())
            .with_projector(Arc::new(ContentGenerationProjector::new(delete_policy)));
        Self::new(ContentServices {
            clock,
            store: Arc::new(store),
            reader: Arc::new(PgContentGenerations::new(pool)),
            generator,
        })
    }

    /// State held entirely in memory; lost on restart.
    #[must_use]
    pub fn in_memory(
        clock: Arc<dyn Clock>,
        generator: Arc<dyn TextGenerator>,
        delete_policy: DeletePolicy,
    ) -> Self {
        let store = InMemoryEventStore::<ContentGenerationTable>::default()
            .with_projector(Arc::new(ContentGenerationProjector::new(delete_policy)));
        let reader = InMemoryContentGenerations::new(store.read_model());
        Self::new(ContentServices {
            clock,
            store: Arc::new(store),
            reader: Arc::new(reader),
            generator,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("commands", &self.commands)
            .field("queries", &self.queries)
            .finish_non_exhaustive()
    }
}
