//! In-memory read model, paired with `InMemoryEventStore` for development
//! and tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quill_core::error::DomainError;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::read_model::{
    ContentGeneration, ContentGenerationReader, ContentGenerationWriter,
};

/// The `content_generations` table held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ContentGenerationTable {
    rows: Vec<ContentGeneration>,
}

impl ContentGenerationTable {
    /// Returns the row for `aggregate_id`, if any.
    #[must_use]
    pub fn get(&self, aggregate_id: Uuid) -> Option<&ContentGeneration> {
        self.rows.iter().find(|row| row.aggregate_id == aggregate_id)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows ordered by `created_at` descending; later inserts win ties.
    #[must_use]
    pub fn newest_first(&self) -> Vec<ContentGeneration> {
        let mut rows: Vec<_> = self.rows.iter().rev().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }

    fn get_mut(&mut self, aggregate_id: Uuid) -> Option<&mut ContentGeneration> {
        self.rows
            .iter_mut()
            .find(|row| row.aggregate_id == aggregate_id)
    }
}

#[async_trait]
impl ContentGenerationWriter for ContentGenerationTable {
    async fn insert(&mut self, row: ContentGeneration) -> Result<(), DomainError> {
        if self.get(row.aggregate_id).is_some() {
            return Err(DomainError::Infrastructure(format!(
                "content generation {} already exists",
                row.aggregate_id
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    async fn mark_completed(
        &mut self,
        aggregate_id: Uuid,
        generated_content: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let Some(row) = self.get_mut(aggregate_id) else {
            return Ok(false);
        };
        row.complete(generated_content.to_owned(), at);
        Ok(true)
    }

    async fn mark_failed(
        &mut self,
        aggregate_id: Uuid,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, DomainError> {
        let Some(row) = self.get_mut(aggregate_id) else {
            return Ok(false);
        };
        row.fail(reason.to_owned(), at);
        Ok(true)
    }

    async fn remove(&mut self, aggregate_id: Uuid) -> Result<bool, DomainError> {
        let before = self.rows.len();
        self.rows.retain(|row| row.aggregate_id != aggregate_id);
        Ok(self.rows.len() != before)
    }
}

/// Query-side view over a shared [`ContentGenerationTable`].
#[derive(Debug, Clone)]
pub struct InMemoryContentGenerations {
    table: Arc<Mutex<ContentGenerationTable>>,
}

impl InMemoryContentGenerations {
    /// Reads from `table`, typically `InMemoryEventStore::read_model()`.
    #[must_use]
    pub fn new(table: Arc<Mutex<ContentGenerationTable>>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl ContentGenerationReader for InMemoryContentGenerations {
    async fn find(&self, aggregate_id: Uuid) -> Result<Option<ContentGeneration>, DomainError> {
        Ok(self.table.lock().await.get(aggregate_id).cloned())
    }

    async fn list_newest_first(&self) -> Result<Vec<ContentGeneration>, DomainError> {
        Ok(self.table.lock().await.newest_first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(prompt: &str, created_at: DateTime<Utc>) -> ContentGeneration {
        ContentGeneration::pending(Uuid::new_v4(), prompt.to_owned(), created_at)
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        // Arrange
        let mut table = ContentGenerationTable::default();
        let early = Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 1, 15, 11, 0, 0).unwrap();
        table.insert(row("older prompt", early)).await.unwrap();
        table.insert(row("newer prompt", late)).await.unwrap();
        let reader = InMemoryContentGenerations::new(Arc::new(Mutex::new(table)));

        // Act
        let rows = reader.list_newest_first().await.unwrap();

        // Assert
        let prompts: Vec<&str> = rows.iter().map(|r| r.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["newer prompt", "older prompt"]);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_rejected() {
        let mut table = ContentGenerationTable::default();
        let first = row("prompt", Utc::now());
        let duplicate = first.clone();
        table.insert(first).await.unwrap();

        let result = table.insert(duplicate).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_updates_report_missing_rows() {
        let mut table = ContentGenerationTable::default();

        let completed = table
            .mark_completed(Uuid::new_v4(), "text", Utc::now())
            .await
            .unwrap();
        let removed = table.remove(Uuid::new_v4()).await.unwrap();

        assert!(!completed);
        assert!(!removed);
    }
}
