//! API token issuing and validation.
//!
//! A token is `<keyId>.<secret>`. Only the SHA-256 hash of the secret is
//! stored; the full token is shown once at creation.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use hedgedoc_core::{defaults, AuthToken, AuthTokenRepository, Error, Result, User, UserRepository};

/// Hash a token secret for storage.
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// A freshly issued token. `secret` is the full bearer value.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: AuthToken,
    pub secret: String,
}

#[derive(Clone)]
pub struct AuthService {
    tokens: Arc<dyn AuthTokenRepository>,
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(tokens: Arc<dyn AuthTokenRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { tokens, users }
    }

    /// Issue a token for `user`. Validity is capped at two years.
    pub async fn issue_token(
        &self,
        user: &User,
        label: &str,
        validity_days: Option<i64>,
    ) -> Result<IssuedToken> {
        let days = validity_days.unwrap_or(defaults::TOKEN_DEFAULT_VALIDITY_DAYS);
        if days <= 0 {
            return Err(Error::Client("Token validity must be positive".to_string()));
        }
        let days = days.min(defaults::TOKEN_MAX_VALIDITY_DAYS);

        let key_id = random_hex(defaults::TOKEN_KEY_ID_BYTES);
        let secret = random_hex(defaults::TOKEN_SECRET_BYTES);
        let token = self
            .tokens
            .create(
                user.id,
                &key_id,
                label,
                &hash_secret(&secret),
                Utc::now() + Duration::days(days),
            )
            .await?;

        info!(
            subsystem = "auth",
            op = "issue_token",
            user_id = %user.id,
            key_id = %key_id,
            "API token issued"
        );
        Ok(IssuedToken {
            token,
            secret: format!("{}.{}", key_id, secret),
        })
    }

    /// Resolve a bearer token to its user.
    pub async fn validate_token(&self, bearer: &str) -> Result<User> {
        let (key_id, secret) = bearer
            .split_once('.')
            .ok_or_else(|| Error::Unauthorized("Malformed token".to_string()))?;

        let token = match self.tokens.get_by_key_id(key_id).await {
            Ok(token) => token,
            Err(Error::NotInDb(_)) => {
                return Err(Error::Unauthorized("Unknown token".to_string()))
            }
            Err(e) => return Err(e),
        };

        if hash_secret(secret) != token.hash {
            debug!(subsystem = "auth", key_id = %key_id, "Token secret mismatch");
            return Err(Error::Unauthorized("Unknown token".to_string()));
        }
        let now = Utc::now();
        if token.is_expired(now) {
            return Err(Error::Unauthorized("Token has expired".to_string()));
        }

        self.tokens.touch_last_used(token.id, now).await?;
        self.users.get_by_id(token.user_id).await
    }

    pub async fn list_tokens(&self, user: &User) -> Result<Vec<AuthToken>> {
        self.tokens.list_for_user(user.id).await
    }

    /// Revoke one of the user's tokens by key id.
    pub async fn revoke_token(&self, user: &User, key_id: &str) -> Result<()> {
        let token = self.tokens.get_by_key_id(key_id).await?;
        if token.user_id != user.id {
            return Err(Error::Permission(format!(
                "Token '{}' does not belong to '{}'",
                key_id, user.username
            )));
        }
        self.tokens.delete(token.id).await
    }
}
