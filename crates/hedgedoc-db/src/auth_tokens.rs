//! API token repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use hedgedoc_core::{AuthToken, AuthTokenRepository, Error, Result};

const TOKEN_COLUMNS: &str = "id, key_id, user_id, label, hash, valid_until, last_used, created_at";

fn token_from_row(row: &PgRow) -> AuthToken {
    AuthToken {
        id: row.get("id"),
        key_id: row.get("key_id"),
        user_id: row.get("user_id"),
        label: row.get("label"),
        hash: row.get("hash"),
        valid_until: row.get("valid_until"),
        last_used: row.get("last_used"),
        created_at: row.get("created_at"),
    }
}

/// PostgreSQL implementation of AuthTokenRepository.
#[derive(Clone)]
pub struct PgAuthTokenRepository {
    pool: Pool<Postgres>,
}

impl PgAuthTokenRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthTokenRepository for PgAuthTokenRepository {
    async fn create(
        &self,
        user_id: Uuid,
        key_id: &str,
        label: &str,
        hash: &str,
        valid_until: DateTime<Utc>,
    ) -> Result<AuthToken> {
        let row = sqlx::query(&format!(
            "INSERT INTO auth_token (id, key_id, user_id, label, hash, valid_until, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            TOKEN_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(key_id)
        .bind(user_id)
        .bind(label)
        .bind(hash)
        .bind(valid_until)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(token_from_row(&row))
    }

    async fn get_by_key_id(&self, key_id: &str) -> Result<AuthToken> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM auth_token WHERE key_id = $1",
            TOKEN_COLUMNS
        ))
        .bind(key_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.map(|r| token_from_row(&r))
            .ok_or_else(|| Error::NotInDb(format!("Token with key id '{}' not found", key_id)))
    }

    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE auth_token SET last_used = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AuthToken>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM auth_token WHERE user_id = $1 ORDER BY created_at DESC",
            TOKEN_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(token_from_row).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM auth_token WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotInDb(format!("Token '{}' not found", id)));
        }
        Ok(())
    }
}
