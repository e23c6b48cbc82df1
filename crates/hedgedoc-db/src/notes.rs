//! Note repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use hedgedoc_core::{
    CreateNoteRequest, Error, Note, NoteRepository, NoteUserPermission, Result,
};

/// Select list shared by every note query; tags are folded into an array.
const NOTE_SELECT: &str = r#"
    SELECT n.id, n.alias, n.owner_id, n.title, n.description, n.content,
           n.created_at, n.updated_at,
           COALESCE(
               array_agg(t.name ORDER BY t.name) FILTER (WHERE t.name IS NOT NULL),
               '{}'
           ) AS tags
    FROM note n
    LEFT JOIN note_tag t ON t.note_id = n.id
"#;

fn note_from_row(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        alias: row.get("alias"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        description: row.get("description"),
        content: row.get("content"),
        tags: row.get("tags"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Deduplicate tags while keeping them sorted.
fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut result: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    result.sort();
    result.dedup();
    result
}

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn replace_tags_tx(
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
        tags: &[String],
    ) -> Result<()> {
        sqlx::query("DELETE FROM note_tag WHERE note_id = $1")
            .bind(note_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        let tags = normalize_tags(tags);
        if !tags.is_empty() {
            sqlx::query(
                "INSERT INTO note_tag (note_id, name) SELECT $1, UNNEST($2::text[])",
            )
            .bind(note_id)
            .bind(&tags)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        }
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn create(&self, req: CreateNoteRequest) -> Result<Note> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(
            "INSERT INTO note (id, alias, owner_id, title, description, content, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)",
        )
        .bind(id)
        .bind(&req.alias)
        .bind(req.owner_id)
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.content)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            let err = Error::Database(e);
            if err.is_unique_violation() {
                Error::AlreadyInDb(format!(
                    "A note with the alias '{}' already exists",
                    req.alias.as_deref().unwrap_or_default()
                ))
            } else {
                err
            }
        })?;

        Self::replace_tags_tx(&mut tx, id, &req.tags).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "notes",
            op = "create",
            note_id = %id,
            alias = req.alias.as_deref().unwrap_or(""),
            "Note created"
        );
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Note> {
        let row = sqlx::query(&format!("{} WHERE n.id = $1 GROUP BY n.id", NOTE_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.map(|r| note_from_row(&r))
            .ok_or_else(|| Error::note_not_found(&id.to_string()))
    }

    async fn get_by_id_or_alias(&self, id_or_alias: &str) -> Result<Note> {
        debug!(
            subsystem = "db",
            component = "notes",
            op = "resolve",
            note = %id_or_alias,
            "Resolving note identifier"
        );
        let row = sqlx::query(&format!(
            "{} WHERE n.alias = $1 OR n.id::text = $1 GROUP BY n.id LIMIT 1",
            NOTE_SELECT
        ))
        .bind(id_or_alias)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.map(|r| note_from_row(&r))
            .ok_or_else(|| Error::note_not_found(id_or_alias))
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Note>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!("{} WHERE n.id = ANY($1) GROUP BY n.id", NOTE_SELECT))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(note_from_row).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // Uploads, history entries, tags and grants cascade with the note.
        let result = sqlx::query("DELETE FROM note WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::note_not_found(&id.to_string()));
        }
        info!(subsystem = "db", component = "notes", op = "delete", note_id = %id, "Note deleted");
        Ok(())
    }

    async fn set_tags(&self, id: Uuid, tags: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM note WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if !exists {
            return Err(Error::note_not_found(&id.to_string()));
        }

        Self::replace_tags_tx(&mut tx, id, tags).await?;
        sqlx::query("UPDATE note SET updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn grant_user_permission(
        &self,
        note_id: Uuid,
        user_id: Uuid,
        can_edit: bool,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO note_user_permission (note_id, user_id, can_edit)
             VALUES ($1, $2, $3)
             ON CONFLICT (note_id, user_id) DO UPDATE SET can_edit = EXCLUDED.can_edit",
        )
        .bind(note_id)
        .bind(user_id)
        .bind(can_edit)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn list_user_permissions(&self, note_id: Uuid) -> Result<Vec<NoteUserPermission>> {
        let rows = sqlx::query(
            "SELECT note_id, user_id, can_edit FROM note_user_permission WHERE note_id = $1",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows
            .into_iter()
            .map(|r| NoteUserPermission {
                note_id: r.get("note_id"),
                user_id: r.get("user_id"),
                can_edit: r.get("can_edit"),
            })
            .collect())
    }
}
