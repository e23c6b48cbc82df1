//! Core traits for the hedgedoc backend.
//!
//! Repositories expose typed CRUD over the relational schema; the services in
//! `hedgedoc-api` depend only on these traits so the PostgreSQL layer and the
//! in-memory test store are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// USER REPOSITORY TRAITS
// =============================================================================

/// Repository for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a user. Fails with `AlreadyInDb` if the username is taken.
    async fn create(&self, req: CreateUserRequest) -> Result<User>;

    /// Fetch a user by id.
    async fn get_by_id(&self, id: Uuid) -> Result<User>;

    /// Fetch a user by username. Fails with `NotInDb` if absent.
    async fn get_by_username(&self, username: &str) -> Result<User>;

    /// Delete a user together with identities, tokens, owned notes,
    /// uploads and history entries.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Repository for authentication identities.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Link a new identity. The request is validated before insert.
    async fn create(&self, identity: NewIdentity) -> Result<Identity>;

    /// All identities of a user.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Identity>>;

    /// The identity of a user for a given provider, if any.
    async fn find_for_provider(
        &self,
        user_id: Uuid,
        provider_type: ProviderType,
    ) -> Result<Option<Identity>>;

    /// Replace the password hash of a local identity.
    async fn update_password_hash(&self, identity_id: Uuid, password_hash: &str) -> Result<()>;
}

/// Repository for API tokens.
#[async_trait]
pub trait AuthTokenRepository: Send + Sync {
    /// Persist a new token record.
    async fn create(
        &self,
        user_id: Uuid,
        key_id: &str,
        label: &str,
        hash: &str,
        valid_until: DateTime<Utc>,
    ) -> Result<AuthToken>;

    /// Fetch a token by its public key id. Fails with `NotInDb` if absent.
    async fn get_by_key_id(&self, key_id: &str) -> Result<AuthToken>;

    /// Record a successful use of the token.
    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// All tokens of a user.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AuthToken>>;

    /// Revoke a token.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// NOTE REPOSITORY TRAITS
// =============================================================================

/// Repository for notes, their tags and permission grants.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a note. Fails with `AlreadyInDb` if the alias is taken.
    async fn create(&self, req: CreateNoteRequest) -> Result<Note>;

    /// Fetch a note by id. Fails with `NotInDb` if absent.
    async fn get_by_id(&self, id: Uuid) -> Result<Note>;

    /// Resolve an id or alias to a note. Fails with `NotInDb` if neither matches.
    async fn get_by_id_or_alias(&self, id_or_alias: &str) -> Result<Note>;

    /// Fetch several notes at once. Missing ids are skipped.
    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Note>>;

    /// Delete a note together with its uploads, history entries, tags and grants.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Replace the tag set of a note.
    async fn set_tags(&self, id: Uuid, tags: &[String]) -> Result<()>;

    /// Grant (or update) a user's permission on a note.
    async fn grant_user_permission(&self, note_id: Uuid, user_id: Uuid, can_edit: bool)
        -> Result<()>;

    /// All user grants on a note.
    async fn list_user_permissions(&self, note_id: Uuid) -> Result<Vec<NoteUserPermission>>;
}

// =============================================================================
// MEDIA TRAITS
// =============================================================================

/// Repository for media upload metadata.
#[async_trait]
pub trait MediaUploadRepository: Send + Sync {
    /// Persist upload metadata.
    async fn insert(&self, upload: &MediaUpload) -> Result<()>;

    /// Fetch an upload by id. Fails with `NotInDb` if absent.
    async fn get(&self, id: &str) -> Result<MediaUpload>;

    /// All uploads made by a user.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<MediaUpload>>;

    /// All uploads attached to a note.
    async fn list_by_note(&self, note_id: Uuid) -> Result<Vec<MediaUpload>>;

    /// Uploads whose rows go away when the user is deleted: their own
    /// uploads and anything attached to notes they own.
    async fn list_removed_with_user(&self, user_id: Uuid) -> Result<Vec<MediaUpload>>;

    /// Remove upload metadata.
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Storage collaborator for uploaded bytes.
///
/// Failures must be reported as `Error::MediaBackend`.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Which backend this is, recorded on every upload.
    fn backend_type(&self) -> BackendType;

    /// Store bytes under `file_name`, returning the public URL and an
    /// optional backend-specific locator.
    async fn save_file(&self, buffer: &[u8], file_name: &str) -> Result<(String, Option<String>)>;

    /// Remove previously stored bytes.
    async fn delete_file(&self, file_name: &str, backend_data: Option<&str>) -> Result<()>;
}

// =============================================================================
// HISTORY REPOSITORY TRAITS
// =============================================================================

/// Repository for per-user history entries.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// All entries of a user, unordered.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<HistoryEntry>>;

    /// The entry for a (user, note) pair, if any.
    async fn find(&self, user_id: Uuid, note_id: Uuid) -> Result<Option<HistoryEntry>>;

    /// Insert an entry. If one already exists for the pair, its timestamp is
    /// moved forward instead and the stored entry is returned.
    async fn insert(&self, entry: &HistoryEntry) -> Result<HistoryEntry>;

    /// Persist pin status and timestamp of an existing entry.
    async fn update(&self, entry: &HistoryEntry) -> Result<HistoryEntry>;

    /// Remove the entry for a (user, note) pair.
    async fn delete(&self, user_id: Uuid, note_id: Uuid) -> Result<()>;

    /// Remove every entry of a user, returning how many were removed.
    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64>;
}
