//! Read-model projection abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::store::StoredEvent;

/// Keeps a read model in step with the event log.
///
/// `C` is the write context the store hands over: a database connection
/// inside the append transaction, or an in-memory table. Projectors are
/// invoked synchronously for each inserted event whose type they handle, in
/// append order.
#[async_trait]
pub trait Projector<C: ?Sized + Send>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Returns `true` if this projector subscribes to `event_type`.
    fn handles(&self, event_type: &str) -> bool;

    /// Applies one event to the read model.
    ///
    /// # Errors
    ///
    /// Any error aborts the append that produced `event`.
    async fn project(&self, ctx: &mut C, event: &StoredEvent) -> Result<(), DomainError>;
}
