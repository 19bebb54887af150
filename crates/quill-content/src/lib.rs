//! Quill: Content Generation bounded context.
//!
//! A user prompt becomes a `ContentGeneration` aggregate whose history is
//! recorded as domain events; a projector keeps the `content_generations`
//! read model in step, and queries read only from that model.

pub mod application;
pub mod domain;
pub mod infrastructure;
