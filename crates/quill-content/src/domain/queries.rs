//! Queries for the Content Generation context.

use quill_core::command::Query;
use uuid::Uuid;

use crate::domain::events::ContentEvent;
use crate::domain::read_model::ContentGeneration;

/// Looks up one generation row. A missing id yields `None`.
#[derive(Debug, Clone, Copy)]
pub struct GetContentGeneration {
    /// The generation to fetch.
    pub aggregate_id: Option<Uuid>,
}

impl Query for GetContentGeneration {
    type Output = Option<ContentGeneration>;

    fn query_type(&self) -> &'static str {
        "content.get_content_generation"
    }
}

/// Lists every generation row, newest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetContentGenerations;

impl Query for GetContentGenerations {
    type Output = Vec<ContentGeneration>;

    fn query_type(&self) -> &'static str {
        "content.get_content_generations"
    }
}

/// Loads the typed event history of one generation, oldest first.
#[derive(Debug, Clone, Copy)]
pub struct GetContentHistory {
    /// The generation whose events to load.
    pub aggregate_id: Uuid,
}

impl Query for GetContentHistory {
    type Output = Vec<ContentEvent>;

    fn query_type(&self) -> &'static str {
        "content.get_content_history"
    }
}
