//! `PostgreSQL` implementation of the `EventStore` trait.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use quill_core::error::DomainError;
use quill_core::event::NewEvent;
use quill_core::projection::Projector;
use quill_core::store::{EventStore, StoredEvent};

/// Name of the unique constraint on `(aggregate_id, version)`.
const VERSION_CONSTRAINT: &str = "uq_domain_events_aggregate_version";

/// SQLSTATE raised when a serializable transaction loses a race.
const SERIALIZATION_FAILURE: &str = "40001";

/// Projector that writes through the append transaction's connection.
pub type PgProjector = Arc<dyn Projector<PgConnection>>;

/// PostgreSQL-backed event store.
///
/// Every `append` runs in one transaction: the next version is read with
/// `MAX(version)` on the same connection that inserts, and registered
/// projectors update the read model on that connection too, so the event
/// rows and their projections commit or roll back together.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
    projectors: Vec<PgProjector>,
}

impl PgEventStore {
    /// Creates a new `PgEventStore` with no projectors.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            projectors: Vec::new(),
        }
    }

    /// Registers a projector, invoked after each matching insert.
    #[must_use]
    pub fn with_projector(mut self, projector: PgProjector) -> Self {
        self.projectors.push(projector);
        self
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn project(&self, conn: &mut PgConnection, event: &StoredEvent) -> Result<(), DomainError> {
        for projector in &self.projectors {
            if projector.handles(&event.event_type) {
                debug!(
                    projector = projector.name(),
                    event_type = %event.event_type,
                    version = event.version,
                    "projecting event"
                );
                projector.project(conn, event).await?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for PgEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgEventStore")
            .field("pool", &self.pool)
            .field(
                "projectors",
                &self.projectors.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn is_serialization_failure(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(SERIALIZATION_FAILURE))
}

fn map_insert_error(err: sqlx::Error, aggregate_id: Uuid, version: i64) -> DomainError {
    let version_taken = matches!(
        &err,
        sqlx::Error::Database(db) if db.constraint() == Some(VERSION_CONSTRAINT)
    );
    if version_taken || is_serialization_failure(&err) {
        return DomainError::ConcurrencyConflict {
            aggregate_id,
            version,
        };
    }
    DomainError::Infrastructure(format!("event insert failed: {err}"))
}

fn infrastructure(context: &str) -> impl FnOnce(sqlx::Error) -> DomainError + '_ {
    move |err| DomainError::Infrastructure(format!("{context}: {err}"))
}

fn row_to_stored_event(row: &PgRow) -> Result<StoredEvent, sqlx::Error> {
    let metadata: Option<serde_json::Value> = row.try_get("metadata")?;
    Ok(StoredEvent {
        event_id: row.try_get("event_id")?,
        aggregate_id: row.try_get("aggregate_id")?,
        aggregate_type: row.try_get("aggregate_type")?,
        event_type: row.try_get("event_type")?,
        version: row.try_get("version")?,
        payload: row.try_get("payload")?,
        metadata: metadata.unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new())),
        occurred_at: row.try_get("occurred_at")?,
    })
}

#[async_trait]
impl EventStore for PgEventStore {
    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn append(&self, events: &[NewEvent]) -> Result<Vec<StoredEvent>, DomainError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(infrastructure("failed to begin transaction"))?;

        let mut stored_events = Vec::with_capacity(events.len());
        for event in events {
            let current: Option<i64> = sqlx::query_scalar(
                "SELECT MAX(version) FROM domain_events WHERE aggregate_id = $1",
            )
            .bind(event.aggregate_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(infrastructure("failed to read current version"))?;
            let version = current.unwrap_or(0) + 1;

            sqlx::query(
                r"
                INSERT INTO domain_events
                    (event_id, aggregate_id, aggregate_type, event_type, version, payload, metadata, occurred_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(event.event_id)
            .bind(event.aggregate_id)
            .bind(&event.aggregate_type)
            .bind(&event.event_type)
            .bind(version)
            .bind(&event.payload)
            .bind(&event.metadata)
            .bind(event.occurred_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, event.aggregate_id, version))?;

            let stored = event.clone().into_stored(version);
            self.project(&mut *tx, &stored).await?;
            stored_events.push(stored);
        }

        tx.commit().await.map_err(|e| {
            if is_serialization_failure(&e) {
                let last = stored_events.last();
                DomainError::ConcurrencyConflict {
                    aggregate_id: last.map_or_else(Uuid::nil, |s| s.aggregate_id),
                    version: last.map_or(0, |s| s.version),
                }
            } else {
                DomainError::Infrastructure(format!("failed to commit events: {e}"))
            }
        })?;

        Ok(stored_events)
    }

    #[instrument(skip(self))]
    async fn load_events(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let rows = sqlx::query(
            r"
            SELECT event_id, aggregate_id, aggregate_type, event_type, version, payload, metadata, occurred_at
            FROM domain_events
            WHERE aggregate_id = $1
            ORDER BY version ASC
            ",
        )
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure("failed to load events"))?;

        rows.iter()
            .map(row_to_stored_event)
            .collect::<Result<Vec<_>, _>>()
            .map_err(infrastructure("failed to decode event row"))
    }
}
