//! Command and query abstractions.

use uuid::Uuid;

/// Trait that all commands implement.
///
/// Commands mutate state through the event store and may return an
/// identifier.
pub trait Command: Send + Sync + std::fmt::Debug + 'static {
    /// The value a handler returns for this command.
    type Output: Send + 'static;

    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;
}

/// Trait that all queries implement. Queries only read the read model.
pub trait Query: Send + Sync + std::fmt::Debug + 'static {
    /// The value a handler returns for this query.
    type Output: Send + 'static;

    /// The type name for this query (for logging/routing).
    fn query_type(&self) -> &'static str;
}
