//! User accounts and local password identities.

use std::sync::Arc;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::RngCore;
use tracing::{info, warn};

use hedgedoc_core::{
    CreateUserRequest, Error, Identity, IdentityRepository, MediaBackend, MediaUploadRepository,
    NewIdentity, ProviderType, Result, User, UserInfoDto, UserRepository,
};

/// Minimum length of a local password.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Hash a password with Argon2id and a random salt into a PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_string = SaltString::encode_b64(&salt)
        .map_err(|e| Error::Internal(format!("Failed to encode salt: {}", e)))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt_string)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC string.
pub fn verify_password_hash(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| Error::Internal(format!("Stored password hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    identities: Arc<dyn IdentityRepository>,
    media: Arc<dyn MediaUploadRepository>,
    backend: Arc<dyn MediaBackend>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        identities: Arc<dyn IdentityRepository>,
        media: Arc<dyn MediaUploadRepository>,
        backend: Arc<dyn MediaBackend>,
    ) -> Self {
        Self {
            users,
            identities,
            media,
            backend,
        }
    }

    pub async fn create_user(
        &self,
        username: &str,
        display_name: &str,
        email: Option<String>,
    ) -> Result<User> {
        let username = username.trim().to_lowercase();
        if username.is_empty() || username.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(Error::Client(format!("Invalid username '{}'", username)));
        }
        let display_name = if display_name.trim().is_empty() {
            username.clone()
        } else {
            display_name.trim().to_string()
        };
        self.users
            .create(CreateUserRequest {
                username,
                display_name,
                email,
            })
            .await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<User> {
        self.users.get_by_username(&username.trim().to_lowercase()).await
    }

    /// Attach a password identity to `user`.
    pub async fn add_local_identity(&self, user: &User, password: &str) -> Result<Identity> {
        check_password_strength(password)?;
        let hash = hash_password(password)?;
        self.identities
            .create(NewIdentity::local(user.id, hash))
            .await
    }

    /// Replace the password of the user's local identity.
    pub async fn update_password(&self, user: &User, password: &str) -> Result<()> {
        check_password_strength(password)?;
        let identity = self
            .identities
            .find_for_provider(user.id, ProviderType::Local)
            .await?
            .ok_or_else(|| {
                Error::NotInDb(format!("User '{}' has no local identity", user.username))
            })?;
        let hash = hash_password(password)?;
        self.identities
            .update_password_hash(identity.id, &hash)
            .await
    }

    /// Check a password against the user's local identity.
    pub async fn verify_password(&self, user: &User, password: &str) -> Result<()> {
        let identity = self
            .identities
            .find_for_provider(user.id, ProviderType::Local)
            .await?;
        let stored = identity
            .and_then(|i| i.password_hash)
            .ok_or_else(|| Error::Unauthorized("Password login is not available".to_string()))?;
        if verify_password_hash(password, &stored)? {
            Ok(())
        } else {
            Err(Error::Unauthorized("Password is incorrect".to_string()))
        }
    }

    /// Delete a user and everything they own.
    ///
    /// Stored bytes are removed first for the user's uploads and for uploads
    /// others attached to the user's notes; rows cascade.
    pub async fn delete_user(&self, user: &User) -> Result<()> {
        for upload in self.media.list_removed_with_user(user.id).await? {
            if let Err(e) = self
                .backend
                .delete_file(&upload.id, upload.backend_data.as_deref())
                .await
            {
                warn!(
                    subsystem = "users",
                    op = "delete",
                    user_id = %user.id,
                    media_id = %upload.id,
                    error = %e,
                    "Could not remove media file of deleted user"
                );
            }
        }
        self.users.delete(user.id).await?;
        info!(subsystem = "users", op = "delete", user_id = %user.id, "User deleted");
        Ok(())
    }

    pub fn to_user_info_dto(&self, user: &User) -> UserInfoDto {
        UserInfoDto::from(user)
    }
}

fn check_password_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::Client(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
