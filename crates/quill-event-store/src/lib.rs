//! Event store implementations for the Quill content studio.
//!
//! Both stores honour the same contract: per-aggregate versions assigned as
//! `max + 1` inside the append, and projectors invoked synchronously for
//! every inserted event before the append commits.

pub mod in_memory;
pub mod pg_event_store;

pub use in_memory::InMemoryEventStore;
pub use pg_event_store::PgEventStore;
