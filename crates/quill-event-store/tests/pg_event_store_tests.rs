//! Integration tests for `PgEventStore`.
//!
//! These need a PostgreSQL instance reachable through `DATABASE_URL`; run
//! them with `cargo test -- --ignored`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use quill_core::error::DomainError;
use quill_core::clock::SystemClock;
use quill_core::event::{EventMetadata, NewEvent};
use quill_core::projection::Projector;
use quill_core::store::{EventStore, StoredEvent};
use quill_event_store::PgEventStore;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Helper to build a `NewEvent` with sensible defaults.
fn make_new_event(aggregate_id: Uuid, event_type: &str) -> NewEvent {
    NewEvent {
        event_id: Uuid::new_v4(),
        aggregate_id,
        aggregate_type: "Test".to_string(),
        event_type: event_type.to_string(),
        payload: serde_json::json!({"key": "value"}),
        metadata: serde_json::json!({}),
        occurred_at: Utc::now(),
    }
}

/// Projector that refuses one event type, to exercise rollback.
struct Refusing(&'static str);

#[async_trait]
impl Projector<PgConnection> for Refusing {
    fn name(&self) -> &'static str {
        "refusing"
    }

    fn handles(&self, event_type: &str) -> bool {
        event_type == self.0
    }

    async fn project(
        &self,
        _ctx: &mut PgConnection,
        _event: &StoredEvent,
    ) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("refused".into()))
    }
}

// --- load_events ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_load_events_returns_empty_vec_for_nonexistent_aggregate(pool: PgPool) {
    let store = PgEventStore::new(pool);

    let events = store.load_events(Uuid::new_v4()).await.unwrap();

    assert!(events.is_empty());
}

// --- append + load round-trip ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_append_and_load_single_event(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();
    let event = make_new_event(aggregate_id, "test.happened");

    store.append(&[event.clone()]).await.unwrap();

    let loaded = store.load_events(aggregate_id).await.unwrap();
    assert_eq!(loaded.len(), 1);

    let e = &loaded[0];
    assert_eq!(e.event_id, event.event_id);
    assert_eq!(e.aggregate_id, aggregate_id);
    assert_eq!(e.aggregate_type, "Test");
    assert_eq!(e.event_type, "test.happened");
    assert_eq!(e.payload, event.payload);
    assert_eq!(e.metadata, serde_json::json!({}));
    assert_eq!(e.version, 1);
    // PostgreSQL TIMESTAMPTZ has microsecond precision.
    assert_eq!(
        e.occurred_at.timestamp_micros(),
        event.occurred_at.timestamp_micros()
    );
}

// --- ordering ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_two_events_in_one_append_get_versions_one_and_two(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();

    let stored = store
        .append(&[
            make_new_event(aggregate_id, "test.requested"),
            make_new_event(aggregate_id, "test.completed"),
        ])
        .await
        .unwrap();

    assert_eq!(stored[0].version, 1);
    assert_eq!(stored[1].version, 2);
    let loaded = store.load_events(aggregate_id).await.unwrap();
    let loaded_ids: Vec<Uuid> = loaded.iter().map(|e| e.event_id).collect();
    let stored_ids: Vec<Uuid> = stored.iter().map(|e| e.event_id).collect();
    assert_eq!(loaded_ids, stored_ids);
    assert_eq!(loaded[0].event_type, "test.requested");
    assert_eq!(loaded[1].event_type, "test.completed");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_sequential_appends_produce_gapless_versions(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();

    for _ in 0..4 {
        store
            .append(&[make_new_event(aggregate_id, "test.step")])
            .await
            .unwrap();
    }

    let loaded = store.load_events(aggregate_id).await.unwrap();
    let versions: Vec<i64> = loaded.iter().map(|e| e.version).collect();
    assert_eq!(versions, vec![1, 2, 3, 4]);
}

// --- aggregate isolation ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_aggregate_isolation(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let agg_a = Uuid::new_v4();
    let agg_b = Uuid::new_v4();

    store
        .append(&[make_new_event(agg_a, "test.step")])
        .await
        .unwrap();
    store
        .append(&[make_new_event(agg_b, "test.step")])
        .await
        .unwrap();

    let loaded_a = store.load_events(agg_a).await.unwrap();
    let loaded_b = store.load_events(agg_b).await.unwrap();

    assert_eq!(loaded_a.len(), 1);
    assert_eq!(loaded_b.len(), 1);
    assert_eq!(loaded_a[0].version, 1);
    assert_eq!(loaded_b[0].version, 1);
}

// --- concurrency ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_racing_writer_gets_concurrency_conflict(pool: PgPool) {
    let store = PgEventStore::new(pool.clone());
    let aggregate_id = Uuid::new_v4();
    store
        .append(&[make_new_event(aggregate_id, "test.step")])
        .await
        .unwrap();

    // A rival transaction claims version 2 but has not committed yet.
    let mut rival = pool.begin().await.unwrap();
    sqlx::query(
        r"
        INSERT INTO domain_events
            (event_id, aggregate_id, aggregate_type, event_type, version, payload, metadata, occurred_at)
        VALUES ($1, $2, 'Test', 'test.step', 2, '{}'::jsonb, '{}'::jsonb, NOW())
        ",
    )
    .bind(Uuid::new_v4())
    .bind(aggregate_id)
    .execute(&mut *rival)
    .await
    .unwrap();

    // Our append also reads max = 1 and blocks on the unique index.
    let racing = tokio::spawn({
        let store = store.clone();
        async move {
            store
                .append(&[make_new_event(aggregate_id, "test.step")])
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    rival.commit().await.unwrap();

    match racing.await.unwrap() {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id: conflict_agg_id,
            version,
        }) => {
            assert_eq!(conflict_agg_id, aggregate_id);
            assert_eq!(version, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }

    let versions: Vec<i64> = store
        .load_events(aggregate_id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.version)
        .collect();
    assert_eq!(versions, vec![1, 2]);
}

// --- projection atomicity ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_projector_failure_rolls_back_append(pool: PgPool) {
    let store = PgEventStore::new(pool).with_projector(Arc::new(Refusing("test.completed")));
    let aggregate_id = Uuid::new_v4();

    let result = store
        .append(&[
            make_new_event(aggregate_id, "test.requested"),
            make_new_event(aggregate_id, "test.completed"),
        ])
        .await;

    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    assert!(store.load_events(aggregate_id).await.unwrap().is_empty());
}

// --- edge cases ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_append_empty_events_is_noop(pool: PgPool) {
    let store = PgEventStore::new(pool);

    let stored = store.append(&[]).await.unwrap();

    assert!(stored.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_complex_json_payload_round_trip(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();
    let complex_payload = serde_json::json!({
        "nested": {"key": "value", "number": 42},
        "array": [1, "two", null, true, false],
        "null_field": null,
        "empty_object": {},
        "empty_array": []
    });

    let mut event = make_new_event(aggregate_id, "test.happened");
    event.payload = complex_payload.clone();

    store.append(&[event]).await.unwrap();

    let loaded = store.load_events(aggregate_id).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].payload, complex_payload);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_wall_clock_event_reloads_unchanged(pool: PgPool) {
    // Arrange
    let store = PgEventStore::new(pool);
    let metadata = EventMetadata::new(Uuid::new_v4(), &SystemClock);
    let event = NewEvent {
        event_id: metadata.event_id,
        occurred_at: metadata.occurred_at,
        ..make_new_event(metadata.aggregate_id, "test.step")
    };

    // Act
    let stored = store.append(&[event]).await.unwrap();
    let loaded = store.load_events(metadata.aggregate_id).await.unwrap();

    // Assert
    assert_eq!(loaded, stored);
    assert_eq!(loaded[0].occurred_at, metadata.occurred_at);
}
