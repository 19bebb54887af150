//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Failures of the AI capability are not represented here: handlers record
/// them as `Failed` events instead of propagating them.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// Another writer claimed the same aggregate version first.
    #[error("concurrency conflict on aggregate {aggregate_id}: version {version} already exists")]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The version this writer attempted to claim.
        version: i64,
    },

    /// A stored event carries a discriminator no known event variant claims.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// A request was dispatched on a bus with no handler bound to its type.
    #[error("no handler registered for {0}")]
    HandlerNotRegistered(&'static str),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` for errors that indicate a wiring or deployment defect
    /// rather than a runtime condition.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownEventType(_) | Self::HandlerNotRegistered(_)
        )
    }
}
