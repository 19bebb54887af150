//! Application services for the Content Generation context.

pub mod command_handlers;
pub mod projector;
pub mod query_handlers;
pub mod streaming;

use std::sync::Arc;

use quill_core::bus::{CommandBus, QueryBus};
use quill_core::clock::Clock;
use quill_core::generation::TextGenerator;
use quill_core::store::EventStore;

use crate::domain::commands::{DeleteContent, GenerateContent};
use crate::domain::queries::{GetContentGeneration, GetContentGenerations, GetContentHistory};
use crate::domain::read_model::ContentGenerationReader;

use self::command_handlers::{DeleteContentHandler, GenerateContentHandler};
use self::query_handlers::{ContentGenerationQueries, ContentHistoryQuery};

/// Collaborators shared by every content handler.
#[derive(Clone)]
pub struct ContentServices {
    /// Time source for event metadata.
    pub clock: Arc<dyn Clock>,
    /// Event store with the content projector attached.
    pub store: Arc<dyn EventStore>,
    /// Read side of the `content_generations` model.
    pub reader: Arc<dyn ContentGenerationReader>,
    /// AI text generator.
    pub generator: Arc<dyn TextGenerator>,
}

/// Binds every content command and query to its handler.
pub fn register_handlers(
    services: &ContentServices,
    command_bus: &mut CommandBus,
    query_bus: &mut QueryBus,
) {
    command_bus.register::<GenerateContent, _>(GenerateContentHandler::new(
        Arc::clone(&services.clock),
        Arc::clone(&services.store),
        Arc::clone(&services.generator),
    ));
    command_bus.register::<DeleteContent, _>(DeleteContentHandler::new(
        Arc::clone(&services.clock),
        Arc::clone(&services.store),
    ));

    query_bus.register::<GetContentGeneration, _>(ContentGenerationQueries::new(Arc::clone(
        &services.reader,
    )));
    query_bus.register::<GetContentGenerations, _>(ContentGenerationQueries::new(Arc::clone(
        &services.reader,
    )));
    query_bus.register::<GetContentHistory, _>(ContentHistoryQuery::new(Arc::clone(
        &services.store,
    )));
}
