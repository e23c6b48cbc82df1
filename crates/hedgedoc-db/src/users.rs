//! User and identity repository implementations.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use hedgedoc_core::{
    CreateUserRequest, Error, Identity, IdentityRepository, NewIdentity, ProviderType, Result,
    User, UserRepository,
};

const USER_COLUMNS: &str = "id, username, display_name, email, photo, created_at, updated_at";

const IDENTITY_COLUMNS: &str = "id, user_id, provider_type, provider_name, sync_source, \
     provider_user_id, o_auth_access_token, password_hash, created_at, updated_at";

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        email: row.get("email"),
        photo: row.get("photo"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn identity_from_row(row: &PgRow) -> Result<Identity> {
    let provider_type: String = row.get("provider_type");
    Ok(Identity {
        id: row.get("id"),
        user_id: row.get("user_id"),
        provider_type: provider_type.parse()?,
        provider_name: row.get("provider_name"),
        sync_source: row.get("sync_source"),
        provider_user_id: row.get("provider_user_id"),
        o_auth_access_token: row.get("o_auth_access_token"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// PostgreSQL implementation of UserRepository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, req: CreateUserRequest) -> Result<User> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO app_user (id, username, display_name, email, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(&req.username)
        .bind(&req.display_name)
        .bind(&req.email)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let err = Error::Database(e);
            if err.is_unique_violation() {
                Error::AlreadyInDb(format!("A user with username '{}' already exists", req.username))
            } else {
                err
            }
        })?;

        let user = user_from_row(&row);
        info!(
            subsystem = "db",
            component = "users",
            op = "create",
            user_id = %user.id,
            username = %user.username,
            "User created"
        );
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User> {
        let row = sqlx::query(&format!("SELECT {} FROM app_user WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.map(|r| user_from_row(&r))
            .ok_or_else(|| Error::NotInDb(format!("User with id '{}' not found", id)))
    }

    async fn get_by_username(&self, username: &str) -> Result<User> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM app_user WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.map(|r| user_from_row(&r))
            .ok_or_else(|| Error::NotInDb(format!("User with username '{}' not found", username)))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // Identities, tokens, notes, uploads and history rows go with the
        // user through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM app_user WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotInDb(format!("User with id '{}' not found", id)));
        }
        info!(subsystem = "db", component = "users", op = "delete", user_id = %id, "User deleted");
        Ok(())
    }
}

/// PostgreSQL implementation of IdentityRepository.
#[derive(Clone)]
pub struct PgIdentityRepository {
    pool: Pool<Postgres>,
}

impl PgIdentityRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityRepository for PgIdentityRepository {
    async fn create(&self, identity: NewIdentity) -> Result<Identity> {
        identity.validate()?;
        let now = Utc::now();
        let row = sqlx::query(&format!(
            "INSERT INTO identity (id, user_id, provider_type, provider_name, sync_source,
                                   provider_user_id, o_auth_access_token, password_hash,
                                   created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
             RETURNING {}",
            IDENTITY_COLUMNS
        ))
        .bind(Uuid::now_v7())
        .bind(identity.user_id)
        .bind(identity.provider_type.as_str())
        .bind(&identity.provider_name)
        .bind(identity.sync_source)
        .bind(&identity.provider_user_id)
        .bind(&identity.o_auth_access_token)
        .bind(&identity.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let err = Error::Database(e);
            if err.is_unique_violation() {
                Error::AlreadyInDb(format!(
                    "User already has a {} identity",
                    identity.provider_type
                ))
            } else {
                err
            }
        })?;
        identity_from_row(&row)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Identity>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM identity WHERE user_id = $1 ORDER BY created_at",
            IDENTITY_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        rows.iter().map(identity_from_row).collect()
    }

    async fn find_for_provider(
        &self,
        user_id: Uuid,
        provider_type: ProviderType,
    ) -> Result<Option<Identity>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM identity WHERE user_id = $1 AND provider_type = $2
             ORDER BY created_at LIMIT 1",
            IDENTITY_COLUMNS
        ))
        .bind(user_id)
        .bind(provider_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        row.as_ref().map(identity_from_row).transpose()
    }

    async fn update_password_hash(&self, identity_id: Uuid, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE identity SET password_hash = $1, updated_at = $2
             WHERE id = $3 AND provider_type = 'local'",
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(identity_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotInDb(format!(
                "Local identity '{}' not found",
                identity_id
            )));
        }
        Ok(())
    }
}
