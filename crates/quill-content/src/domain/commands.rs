//! Commands for the Content Generation context.

use quill_core::command::Command;
use uuid::Uuid;

/// Command to generate content for a prompt, waiting for the full text.
///
/// Handled to completion: the returned aggregate id refers to a generation
/// that is already `completed` or `failed`.
#[derive(Debug, Clone)]
pub struct GenerateContent {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The validated prompt.
    pub prompt: String,
}

impl Command for GenerateContent {
    type Output = Uuid;

    fn command_type(&self) -> &'static str {
        "content.generate_content"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to delete a generation.
#[derive(Debug, Clone)]
pub struct DeleteContent {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The generation to delete.
    pub aggregate_id: Uuid,
}

impl Command for DeleteContent {
    type Output = ();

    fn command_type(&self) -> &'static str {
        "content.delete_content"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Request to generate content incrementally.
///
/// Not routed through the command bus: the caller consumes chunks while the
/// generation runs, see [`crate::application::streaming`].
#[derive(Debug, Clone)]
pub struct StreamContent {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The validated prompt.
    pub prompt: String,
}
