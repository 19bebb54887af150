//! `PostgreSQL` adapters for the `content_generations` table.
//!
//! The writer is implemented on `PgConnection` so the projector can run on
//! the event store's append transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_core::error::DomainError;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::read_model::{
    ContentGeneration, ContentGenerationReader, ContentGenerationWriter, GenerationStatus,
};

const FIND_SQL: &str = r"
    SELECT aggregate_id, prompt, generated_content, status, failure_reason, created_at, updated_at
    FROM content_generations
    WHERE aggregate_id = $1
";

const LIST_SQL: &str = r"
    SELECT aggregate_id, prompt, generated_content, status, failure_reason, created_at, updated_at
    FROM content_generations
    ORDER BY created_at DESC, id DESC
";

fn infrastructure(context: &str) -> impl FnOnce(sqlx::Error) -> DomainError + '_ {
    move |err| DomainError::Infrastructure(format!("{context}: {err}"))
}

fn decode_error(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("failed to decode content generation row: {err}"))
}

fn row_to_generation(row: &PgRow) -> Result<ContentGeneration, DomainError> {
    let status: String = row.try_get("status").map_err(decode_error)?;
    Ok(ContentGeneration {
        aggregate_id: row.try_get("aggregate_id").map_err(decode_error)?,
        prompt: row.try_get("prompt").map_err(decode_error)?,
        generated_content: row.try_get("generated_content").map_err(decode_error)?,
        status: status.parse()?,
        failure_reason: row.try_get("failure_reason").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
        updated_at: row.try_get("updated_at").map_err(decode_error)?,
    })
}

#[async_trait]
impl ContentGenerationWriter for PgConnection {
    async fn insert(&mut self, row: ContentGeneration) -> Result<(), DomainError> {
        sqlx::query(
            r"
            INSERT INTO content_generations
                (aggregate_id, prompt, generated_content, status, failure_reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(row.aggregate_id)
        .bind(&row.prompt)
        .bind(&row.generated_content)
        .bind(row.status.as_str())
        .bind(&row.failure_reason)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&mut *self)
        .await
        .map_err(infrastructure("failed to insert content generation"))?;
        Ok(())
    }

    async fn mark_completed(
        &mut self,
        aggregate_id: Uuid,
        generated_content: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r"
            UPDATE content_generations
            SET generated_content = $2, status = $3, updated_at = $4
            WHERE aggregate_id = $1
            ",
        )
        .bind(aggregate_id)
        .bind(generated_content)
        .bind(GenerationStatus::Completed.as_str())
        .bind(at)
        .execute(&mut *self)
        .await
        .map_err(infrastructure("failed to complete content generation"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(
        &mut self,
        aggregate_id: Uuid,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r"
            UPDATE content_generations
            SET failure_reason = $2, status = $3, updated_at = $4
            WHERE aggregate_id = $1
            ",
        )
        .bind(aggregate_id)
        .bind(reason)
        .bind(GenerationStatus::Failed.as_str())
        .bind(at)
        .execute(&mut *self)
        .await
        .map_err(infrastructure("failed to fail content generation"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove(&mut self, aggregate_id: Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM content_generations WHERE aggregate_id = $1")
            .bind(aggregate_id)
            .execute(&mut *self)
            .await
            .map_err(infrastructure("failed to remove content generation"))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Query-side reader over the `content_generations` table.
#[derive(Debug, Clone)]
pub struct PgContentGenerations {
    pool: PgPool,
}

impl PgContentGenerations {
    /// Creates a reader on `pool`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentGenerationReader for PgContentGenerations {
    #[instrument(skip(self))]
    async fn find(&self, aggregate_id: Uuid) -> Result<Option<ContentGeneration>, DomainError> {
        let row = sqlx::query(FIND_SQL)
            .bind(aggregate_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure("failed to load content generation"))?;
        row.as_ref().map(row_to_generation).transpose()
    }

    #[instrument(skip(self))]
    async fn list_newest_first(&self) -> Result<Vec<ContentGeneration>, DomainError> {
        let rows = sqlx::query(LIST_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure("failed to list content generations"))?;
        rows.iter().map(row_to_generation).collect()
    }
}
