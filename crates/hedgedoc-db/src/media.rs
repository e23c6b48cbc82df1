//! Media upload metadata repository.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use hedgedoc_core::{Error, MediaUpload, MediaUploadRepository, Result};

const UPLOAD_COLUMNS: &str =
    "id, note_id, user_id, backend_type, file_url, backend_data, created_at";

fn upload_from_row(row: &PgRow) -> Result<MediaUpload> {
    let backend_type: String = row.get("backend_type");
    Ok(MediaUpload {
        id: row.get("id"),
        note_id: row.get("note_id"),
        user_id: row.get("user_id"),
        backend_type: backend_type.parse()?,
        file_url: row.get("file_url"),
        backend_data: row.get("backend_data"),
        created_at: row.get("created_at"),
    })
}

/// PostgreSQL implementation of MediaUploadRepository.
#[derive(Clone)]
pub struct PgMediaUploadRepository {
    pool: Pool<Postgres>,
}

impl PgMediaUploadRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaUploadRepository for PgMediaUploadRepository {
    async fn insert(&self, upload: &MediaUpload) -> Result<()> {
        sqlx::query(
            "INSERT INTO media_upload (id, note_id, user_id, backend_type, file_url, backend_data, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&upload.id)
        .bind(upload.note_id)
        .bind(upload.user_id)
        .bind(upload.backend_type.as_str())
        .bind(&upload.file_url)
        .bind(&upload.backend_data)
        .bind(upload.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let err = Error::Database(e);
            if err.is_unique_violation() {
                Error::AlreadyInDb(format!("Media upload '{}' already exists", upload.id))
            } else {
                err
            }
        })?;

        debug!(
            subsystem = "db",
            component = "media",
            op = "insert",
            media_id = %upload.id,
            note_id = %upload.note_id,
            "Media upload recorded"
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<MediaUpload> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM media_upload WHERE id = $1",
            UPLOAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        match row {
            Some(r) => upload_from_row(&r),
            None => Err(Error::NotInDb(format!("MediaUpload with id '{}' not found", id))),
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<MediaUpload>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM media_upload WHERE user_id = $1 ORDER BY created_at",
            UPLOAD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(upload_from_row).collect()
    }

    async fn list_by_note(&self, note_id: Uuid) -> Result<Vec<MediaUpload>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM media_upload WHERE note_id = $1 ORDER BY created_at",
            UPLOAD_COLUMNS
        ))
        .bind(note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(upload_from_row).collect()
    }

    async fn list_removed_with_user(&self, user_id: Uuid) -> Result<Vec<MediaUpload>> {
        let rows = sqlx::query(
            "SELECT m.id, m.note_id, m.user_id, m.backend_type, m.file_url, m.backend_data, m.created_at
             FROM media_upload m
             JOIN note n ON n.id = m.note_id
             WHERE m.user_id = $1 OR n.owner_id = $1
             ORDER BY m.created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(upload_from_row).collect()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM media_upload WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotInDb(format!("MediaUpload with id '{}' not found", id)));
        }
        Ok(())
    }
}
