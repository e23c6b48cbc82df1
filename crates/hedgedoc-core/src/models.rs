//! Core data models for the hedgedoc backend.
//!
//! Records mirror the relational schema one-to-one. Relationships are plain
//! foreign-key fields; callers resolve them through the repository traits.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};

// =============================================================================
// USER TYPES
// =============================================================================

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for creating a user.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
}

/// Authentication provider backing an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Local,
    Ldap,
    Saml,
    Oauth2,
    Gitlab,
    Github,
    Google,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Ldap => "ldap",
            Self::Saml => "saml",
            Self::Oauth2 => "oauth2",
            Self::Gitlab => "gitlab",
            Self::Github => "github",
            Self::Google => "google",
        }
    }

    /// Providers that authenticate with a stored password hash.
    pub fn uses_password(&self) -> bool {
        matches!(self, Self::Local)
    }

    /// Providers that hand us an OAuth access token.
    pub fn uses_oauth_token(&self) -> bool {
        matches!(self, Self::Oauth2 | Self::Gitlab | Self::Github | Self::Google)
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "local" => Ok(Self::Local),
            "ldap" => Ok(Self::Ldap),
            "saml" => Ok(Self::Saml),
            "oauth2" => Ok(Self::Oauth2),
            "gitlab" => Ok(Self::Gitlab),
            "github" => Ok(Self::Github),
            "google" => Ok(Self::Google),
            other => Err(Error::Serialization(format!(
                "Unknown provider type '{}'",
                other
            ))),
        }
    }
}

/// A credential linking a user to an authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider_type: ProviderType,
    /// Name of the configured provider instance (e.g. "gitlab-internal").
    pub provider_name: Option<String>,
    /// Whether profile data is synced from this identity.
    pub sync_source: bool,
    pub provider_user_id: Option<String>,
    #[serde(skip_serializing)]
    pub o_auth_access_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for linking a new identity to a user.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub user_id: Uuid,
    pub provider_type: ProviderType,
    pub provider_name: Option<String>,
    pub sync_source: bool,
    pub provider_user_id: Option<String>,
    pub o_auth_access_token: Option<String>,
    pub password_hash: Option<String>,
}

impl NewIdentity {
    /// Local identity carrying an already hashed password.
    pub fn local(user_id: Uuid, password_hash: String) -> Self {
        Self {
            user_id,
            provider_type: ProviderType::Local,
            provider_name: None,
            sync_source: true,
            provider_user_id: None,
            o_auth_access_token: None,
            password_hash: Some(password_hash),
        }
    }

    /// Ensure exactly the credential the provider type needs is populated.
    pub fn validate(&self) -> Result<()> {
        let has_password = self.password_hash.is_some();
        let has_token = self.o_auth_access_token.is_some();
        let provider = self.provider_type;

        if provider.uses_password() {
            if !has_password || has_token {
                return Err(Error::Client(format!(
                    "A {} identity requires a password hash and no OAuth token",
                    provider
                )));
            }
        } else if provider.uses_oauth_token() {
            if !has_token || has_password {
                return Err(Error::Client(format!(
                    "A {} identity requires an OAuth access token and no password hash",
                    provider
                )));
            }
        } else if has_password || has_token {
            return Err(Error::Client(format!(
                "A {} identity must not store credentials",
                provider
            )));
        }
        Ok(())
    }
}

/// API token used by the token guard. The secret itself is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: Uuid,
    pub key_id: String,
    pub user_id: Uuid,
    pub label: String,
    #[serde(skip_serializing)]
    pub hash: String,
    pub valid_until: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until <= now
    }
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A note with its tags resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    /// Optional human-chosen unique identifier.
    pub alias: Option<String>,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Public identifier: the alias when set, otherwise the id.
    pub fn identifier(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.id.to_string(),
        }
    }

    /// Derive a title from the first markdown heading of the content.
    pub fn title_from_content(content: &str) -> String {
        content
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with('#'))
            .map(|line| line.trim_start_matches('#').trim())
            .filter(|title| !title.is_empty())
            .unwrap_or(defaults::UNTITLED_NOTE)
            .to_string()
    }

    /// Check that an alias can be used as a note identifier.
    ///
    /// Aliases share the identifier namespace with note ids, so anything that
    /// parses as a UUID is rejected.
    pub fn validate_alias(alias: &str) -> Result<()> {
        if alias.trim().is_empty() {
            return Err(Error::Client("Alias must not be empty".to_string()));
        }
        if alias.contains('/') || alias.chars().any(char::is_whitespace) {
            return Err(Error::Client(format!(
                "Alias '{}' contains forbidden characters",
                alias
            )));
        }
        if Uuid::parse_str(alias).is_ok() {
            return Err(Error::Client(format!(
                "Alias '{}' is reserved because it looks like a note id",
                alias
            )));
        }
        Ok(())
    }
}

/// Request for creating a note.
#[derive(Debug, Clone)]
pub struct CreateNoteRequest {
    pub owner_id: Uuid,
    pub alias: Option<String>,
    pub title: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Per-user permission grant on a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteUserPermission {
    pub note_id: Uuid,
    pub user_id: Uuid,
    pub can_edit: bool,
}

// =============================================================================
// MEDIA TYPES
// =============================================================================

/// Storage collaborator holding the bytes of a media upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    Filesystem,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filesystem => "filesystem",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "filesystem" => Ok(Self::Filesystem),
            other => Err(Error::Config(format!("Unknown media backend '{}'", other))),
        }
    }
}

/// Metadata of an uploaded media file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUpload {
    /// `<32 hex chars>.<extension>`, also the file name in the backend.
    pub id: String,
    pub note_id: Uuid,
    pub user_id: Uuid,
    pub backend_type: BackendType,
    pub file_url: String,
    /// Backend-specific locator, if the backend needs one to delete the file.
    pub backend_data: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MediaUpload {
    /// Generate a fresh upload id from 16 random bytes and the file extension.
    pub fn generate_id(extension: &str) -> String {
        let mut bytes = [0u8; defaults::MEDIA_ID_RANDOM_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("{}.{}", hex::encode(bytes), extension)
    }

    /// Check whether a string has the shape of a generated upload id.
    pub fn is_valid_id(id: &str) -> bool {
        match id.split_once('.') {
            Some((hex_part, ext)) => {
                hex_part.len() == defaults::MEDIA_ID_RANDOM_BYTES * 2
                    && hex_part
                        .chars()
                        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
                    && !ext.is_empty()
                    && ext.chars().all(|c| c.is_ascii_alphanumeric())
            }
            None => false,
        }
    }
}

// =============================================================================
// HISTORY TYPES
// =============================================================================

/// A user's visit record for a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_id: Uuid,
    pub note_id: Uuid,
    pub pin_status: bool,
    pub updated_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(user_id: Uuid, note_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            note_id,
            pin_status: false,
            updated_at: now,
        }
    }

    /// Move the timestamp forward, never backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

// =============================================================================
// DTOS
// =============================================================================

/// History entry as exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryDto {
    pub identifier: String,
    pub title: String,
    pub tags: Vec<String>,
    pub last_visited: DateTime<Utc>,
    pub pin_status: bool,
}

impl HistoryEntryDto {
    pub fn from_parts(entry: &HistoryEntry, note: &Note) -> Self {
        Self {
            identifier: note.identifier(),
            title: note.title.clone(),
            tags: note.tags.clone(),
            last_visited: entry.updated_at,
            pin_status: entry.pin_status,
        }
    }
}

/// Body of `PUT /me/history/:note`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryUpdateDto {
    pub pin_status: bool,
}

/// Response of a successful media upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUploadUrlDto {
    pub url: String,
}

/// Media upload as listed for a user or a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUploadDto {
    pub url: String,
    pub note_id: String,
    pub created_at: DateTime<Utc>,
    pub user_name: String,
}

/// Note as exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDto {
    pub id: Uuid,
    pub alias: Option<String>,
    pub title: String,
    pub description: String,
    pub content: String,
    pub tags: Vec<String>,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile of the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoDto {
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub photo: Option<String>,
}

impl From<&User> for UserInfoDto {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            photo: user.photo.clone(),
        }
    }
}
