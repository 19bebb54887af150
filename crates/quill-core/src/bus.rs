//! Command and query buses.
//!
//! Each bus is a static table from a request's concrete type to exactly one
//! handler, built once at startup. Dispatch is a lookup plus a direct call;
//! an unbound request type is a wiring defect and fails loudly.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::command::{Command, Query};
use crate::error::DomainError;

/// Handles one command type.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    /// Executes `command`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` for infrastructure failures.
    async fn handle(&self, command: C) -> Result<C::Output, DomainError>;
}

/// Handles one query type.
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    /// Executes `query`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` for infrastructure failures.
    async fn handle(&self, query: Q) -> Result<Q::Output, DomainError>;
}

/// Type-keyed handler table shared by both buses.
#[derive(Default)]
struct Registry {
    handlers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Registry {
    fn insert<R: 'static, H: Send + Sync + 'static>(&mut self, handler: H, type_name: &str) {
        if self
            .handlers
            .insert(TypeId::of::<R>(), Box::new(handler))
            .is_some()
        {
            debug!(request_type = type_name, "replaced previously registered handler");
        }
    }

    fn get<R: 'static, H: Clone + 'static>(&self) -> Option<H> {
        self.handlers
            .get(&TypeId::of::<R>())
            .and_then(|handler| handler.downcast_ref::<H>())
            .cloned()
    }

    fn len(&self) -> usize {
        self.handlers.len()
    }
}

/// Routes commands to their registered handlers.
#[derive(Default)]
pub struct CommandBus {
    registry: Registry,
}

impl CommandBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to command type `C`. Re-registering `C` replaces the
    /// previous handler.
    pub fn register<C, H>(&mut self, handler: H)
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        self.registry
            .insert::<C, _>(handler, std::any::type_name::<C>());
    }

    /// Dispatches `command` to the handler bound to its type.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::HandlerNotRegistered` if `C` was never
    /// registered, otherwise whatever the handler returns.
    pub async fn dispatch<C: Command>(&self, command: C) -> Result<C::Output, DomainError> {
        let command_type = command.command_type();
        let handler = self
            .registry
            .get::<C, Arc<dyn CommandHandler<C>>>()
            .ok_or(DomainError::HandlerNotRegistered(command_type))?;

        debug!(command_type, correlation_id = %command.correlation_id(), "dispatching command");
        handler.handle(command).await
    }

    /// Number of registered command types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if no command type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBus")
            .field("handlers", &self.len())
            .finish()
    }
}

/// Routes queries to their registered handlers.
#[derive(Default)]
pub struct QueryBus {
    registry: Registry,
}

impl QueryBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to query type `Q`. Re-registering `Q` replaces the
    /// previous handler.
    pub fn register<Q, H>(&mut self, handler: H)
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let handler: Arc<dyn QueryHandler<Q>> = Arc::new(handler);
        self.registry
            .insert::<Q, _>(handler, std::any::type_name::<Q>());
    }

    /// Dispatches `query` to the handler bound to its type.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::HandlerNotRegistered` if `Q` was never
    /// registered, otherwise whatever the handler returns.
    pub async fn dispatch<Q: Query>(&self, query: Q) -> Result<Q::Output, DomainError> {
        let query_type = query.query_type();
        let handler = self
            .registry
            .get::<Q, Arc<dyn QueryHandler<Q>>>()
            .ok_or(DomainError::HandlerNotRegistered(query_type))?;

        debug!(query_type, "dispatching query");
        handler.handle(query).await
    }

    /// Number of registered query types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns `true` if no query type is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for QueryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBus")
            .field("handlers", &self.len())
            .finish()
    }
}
