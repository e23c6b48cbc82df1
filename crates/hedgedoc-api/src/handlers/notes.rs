//! Note HTTP handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::warn;

use hedgedoc_core::{MediaUploadDto, NoteDto};

use crate::{ApiError, AppState, RequireUser};

/// Create a note from a markdown body.
pub async fn create_note(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    body: String,
) -> Result<(StatusCode, Json<NoteDto>), ApiError> {
    let note = state.notes.create_note(&user, body, None).await?;
    Ok((StatusCode::CREATED, Json(state.notes.to_note_dto(&note).await?)))
}

/// Create a note under a chosen alias.
///
/// # Returns
/// - 201 Created
/// - 400 Bad Request if the alias is not usable
/// - 409 Conflict if the alias is taken
pub async fn create_note_with_alias(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(alias): Path<String>,
    body: String,
) -> Result<(StatusCode, Json<NoteDto>), ApiError> {
    let note = state.notes.create_note(&user, body, Some(alias)).await?;
    Ok((StatusCode::CREATED, Json(state.notes.to_note_dto(&note).await?)))
}

/// Fetch a note and record the visit in the reader's history.
pub async fn get_note(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(note): Path<String>,
) -> Result<Json<NoteDto>, ApiError> {
    let note = state.notes.get_readable_note(&user, &note).await?;
    if let Err(e) = state
        .history
        .create_or_update_history_entry(&note, &user)
        .await
    {
        warn!(
            subsystem = "history",
            note_id = %note.id,
            user_id = %user.id,
            error = %e,
            "Could not record note visit"
        );
    }
    Ok(Json(state.notes.to_note_dto(&note).await?))
}

pub async fn delete_note(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(note): Path<String>,
) -> Result<StatusCode, ApiError> {
    let note = state.notes.get_note_by_id_or_alias(&note).await?;
    state.notes.delete_note(&user, &note).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_note_media(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(note): Path<String>,
) -> Result<Json<Vec<MediaUploadDto>>, ApiError> {
    let note = state.notes.get_readable_note(&user, &note).await?;
    let uploads = state.media.list_for_note(&note).await?;
    Ok(Json(state.media.to_media_upload_dtos(&uploads).await?))
}
