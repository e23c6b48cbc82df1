//! # hedgedoc-db
//!
//! PostgreSQL database layer for the hedgedoc backend.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for users, identities, tokens, notes,
//!   media uploads and history entries
//! - The filesystem media backend
//!
//! ## Example
//!
//! ```rust,ignore
//! use hedgedoc_db::{CreateUserRequest, Database, UserRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/hedgedoc").await?;
//!
//!     let user = db.users.create(CreateUserRequest {
//!         username: "alice".to_string(),
//!         display_name: "Alice".to_string(),
//!         email: None,
//!     }).await?;
//!
//!     println!("Created user: {}", user.id);
//!     Ok(())
//! }
//! ```
pub mod auth_tokens;
pub mod history;
pub mod media;
pub mod media_backends;
pub mod notes;
pub mod pool;
pub mod users;

// Always compiled so integration tests (in tests/) can share the helpers.
pub mod test_fixtures;

// Re-export core types
pub use hedgedoc_core::*;

pub use auth_tokens::PgAuthTokenRepository;
pub use history::PgHistoryRepository;
pub use media::PgMediaUploadRepository;
pub use media_backends::FilesystemBackend;
pub use notes::PgNoteRepository;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use users::{PgIdentityRepository, PgUserRepository};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub users: PgUserRepository,
    pub identities: PgIdentityRepository,
    pub auth_tokens: PgAuthTokenRepository,
    pub notes: PgNoteRepository,
    pub media: PgMediaUploadRepository,
    pub history: PgHistoryRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            identities: PgIdentityRepository::new(pool.clone()),
            auth_tokens: PgAuthTokenRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            media: PgMediaUploadRepository::new(pool.clone()),
            history: PgHistoryRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
