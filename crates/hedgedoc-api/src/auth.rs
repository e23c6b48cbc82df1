//! Bearer token authentication.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use hedgedoc_core::User;

use crate::{ApiError, AppState};

/// Extractor that requires a valid API token and yields its user.
///
/// ```ignore
/// async fn whoami(RequireUser(user): RequireUser) -> String {
///     user.username
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        let user = state.auth.validate_token(token).await?;
        Ok(RequireUser(user))
    }
}
