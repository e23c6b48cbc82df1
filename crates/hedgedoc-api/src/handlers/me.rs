//! Handlers for the authenticated user's own resources.

use axum::{extract::State, http::StatusCode, Json};

use hedgedoc_core::{MediaUploadDto, UserInfoDto};

use crate::{ApiError, AppState, RequireUser};

pub async fn get_me(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Json<UserInfoDto> {
    Json(state.users.to_user_info_dto(&user))
}

/// Delete the account together with its notes, uploads and history.
pub async fn delete_me(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<StatusCode, ApiError> {
    state.users.delete_user(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_my_media(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<MediaUploadDto>>, ApiError> {
    let uploads = state.media.list_for_user(&user).await?;
    Ok(Json(state.media.to_media_upload_dtos(&uploads).await?))
}
