//! History entry repository.
//!
//! Timestamps only ever move forward: both the upsert in `insert` and the
//! plain `update` keep the later of the stored and the supplied value.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use hedgedoc_core::{Error, HistoryEntry, HistoryRepository, Result};

fn entry_from_row(row: &PgRow) -> HistoryEntry {
    HistoryEntry {
        user_id: row.get("user_id"),
        note_id: row.get("note_id"),
        pin_status: row.get("pin_status"),
        updated_at: row.get("updated_at"),
    }
}

/// PostgreSQL implementation of HistoryRepository.
#[derive(Clone)]
pub struct PgHistoryRepository {
    pool: Pool<Postgres>,
}

impl PgHistoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<HistoryEntry>> {
        let rows = sqlx::query(
            "SELECT user_id, note_id, pin_status, updated_at
             FROM history_entry WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(entry_from_row).collect())
    }

    async fn find(&self, user_id: Uuid, note_id: Uuid) -> Result<Option<HistoryEntry>> {
        let row = sqlx::query(
            "SELECT user_id, note_id, pin_status, updated_at
             FROM history_entry WHERE user_id = $1 AND note_id = $2",
        )
        .bind(user_id)
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.as_ref().map(entry_from_row))
    }

    async fn insert(&self, entry: &HistoryEntry) -> Result<HistoryEntry> {
        let row = sqlx::query(
            "INSERT INTO history_entry (user_id, note_id, pin_status, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, note_id) DO UPDATE
                 SET updated_at = GREATEST(history_entry.updated_at, EXCLUDED.updated_at)
             RETURNING user_id, note_id, pin_status, updated_at",
        )
        .bind(entry.user_id)
        .bind(entry.note_id)
        .bind(entry.pin_status)
        .bind(entry.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(entry_from_row(&row))
    }

    async fn update(&self, entry: &HistoryEntry) -> Result<HistoryEntry> {
        let row = sqlx::query(
            "UPDATE history_entry
             SET pin_status = $3, updated_at = GREATEST(updated_at, $4)
             WHERE user_id = $1 AND note_id = $2
             RETURNING user_id, note_id, pin_status, updated_at",
        )
        .bind(entry.user_id)
        .bind(entry.note_id)
        .bind(entry.pin_status)
        .bind(entry.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.map(|r| entry_from_row(&r)).ok_or_else(|| {
            Error::NotInDb(format!(
                "No history entry for note '{}' and user '{}'",
                entry.note_id, entry.user_id
            ))
        })
    }

    async fn delete(&self, user_id: Uuid, note_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM history_entry WHERE user_id = $1 AND note_id = $2")
            .bind(user_id)
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotInDb(format!(
                "No history entry for note '{}' and user '{}'",
                note_id, user_id
            )));
        }
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM history_entry WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}
