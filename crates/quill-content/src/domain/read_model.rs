//! The `content_generations` read model: row shape and storage seams.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_core::error::DomainError;
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle state of a generation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// Requested; no outcome yet.
    Pending,
    /// Text was generated.
    Completed,
    /// Generation failed or was cancelled.
    Failed,
}

impl GenerationStatus {
    /// The value stored in the `status` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::Infrastructure(format!(
                "unknown generation status: {other}"
            ))),
        }
    }
}

/// One row of the `content_generations` read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentGeneration {
    /// The generation's aggregate id.
    pub aggregate_id: Uuid,
    /// The prompt as submitted.
    pub prompt: String,
    /// Generated text; set once the generation completes.
    pub generated_content: Option<String>,
    /// Current lifecycle state.
    pub status: GenerationStatus,
    /// Why the generation failed, if it did.
    pub failure_reason: Option<String>,
    /// When the request event occurred.
    pub created_at: DateTime<Utc>,
    /// When the latest projected event occurred.
    pub updated_at: DateTime<Utc>,
}

impl ContentGeneration {
    /// A freshly requested row.
    #[must_use]
    pub fn pending(aggregate_id: Uuid, prompt: String, requested_at: DateTime<Utc>) -> Self {
        Self {
            aggregate_id,
            prompt,
            generated_content: None,
            status: GenerationStatus::Pending,
            failure_reason: None,
            created_at: requested_at,
            updated_at: requested_at,
        }
    }

    /// Moves the row to `completed`.
    pub fn complete(&mut self, generated_content: String, at: DateTime<Utc>) {
        self.generated_content = Some(generated_content);
        self.status = GenerationStatus::Completed;
        self.updated_at = at;
    }

    /// Moves the row to `failed`.
    pub fn fail(&mut self, reason: String, at: DateTime<Utc>) {
        self.failure_reason = Some(reason);
        self.status = GenerationStatus::Failed;
        self.updated_at = at;
    }
}

/// Read side of the model, used by query handlers.
#[async_trait]
pub trait ContentGenerationReader: Send + Sync {
    /// Fetches the row for `aggregate_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    async fn find(&self, aggregate_id: Uuid) -> Result<Option<ContentGeneration>, DomainError>;

    /// Lists all rows ordered by `created_at` descending.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    async fn list_newest_first(&self) -> Result<Vec<ContentGeneration>, DomainError>;
}

/// Write side of the model, used only by the projector.
///
/// The update methods return `false` when no row exists for the aggregate.
#[async_trait]
pub trait ContentGenerationWriter: Send {
    /// Inserts a new `pending` row.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if a row already exists or
    /// storage fails.
    async fn insert(&mut self, row: ContentGeneration) -> Result<(), DomainError>;

    /// Marks the row `completed` with `generated_content`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    async fn mark_completed(
        &mut self,
        aggregate_id: Uuid,
        generated_content: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Marks the row `failed` with `reason`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    async fn mark_failed(
        &mut self,
        aggregate_id: Uuid,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError>;

    /// Removes the row.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if storage fails.
    async fn remove(&mut self, aggregate_id: Uuid) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_its_own_column_value() {
        for status in [
            GenerationStatus::Pending,
            GenerationStatus::Completed,
            GenerationStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<GenerationStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<GenerationStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(GenerationStatus::Completed).unwrap(),
            serde_json::json!("completed")
        );
    }

    #[test]
    fn test_pending_row_then_fail_sets_reason_and_timestamp() {
        let requested_at = DateTime::<Utc>::UNIX_EPOCH;
        let failed_at = requested_at + chrono::Duration::seconds(5);
        let mut row = ContentGeneration::pending(Uuid::nil(), "p".to_owned(), requested_at);

        row.fail("boom".to_owned(), failed_at);

        assert_eq!(row.status, GenerationStatus::Failed);
        assert_eq!(row.failure_reason.as_deref(), Some("boom"));
        assert_eq!(row.generated_content, None);
        assert_eq!(row.created_at, requested_at);
        assert_eq!(row.updated_at, failed_at);
    }
}
