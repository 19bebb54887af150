//! Shared test mocks and utilities for the Quill content studio.

mod clock;
mod generator;
mod store;

pub use clock::{FixedClock, SteppingClock};
pub use generator::{ChunkedGenerator, FailingGenerator, StubGenerator};
pub use store::{FailingEventStore, RecordingEventStore};
