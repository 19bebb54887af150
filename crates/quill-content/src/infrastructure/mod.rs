//! Storage adapters for the `content_generations` read model.

pub mod in_memory;
pub mod pg_read_model;

pub use in_memory::{ContentGenerationTable, InMemoryContentGenerations};
pub use pg_read_model::PgContentGenerations;
