//! History HTTP handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use hedgedoc_core::{HistoryEntryDto, HistoryEntryUpdateDto};

use crate::{ApiError, AppState, RequireUser};

pub async fn get_history(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<HistoryEntryDto>>, ApiError> {
    Ok(Json(state.history.list_dtos(&user).await?))
}

pub async fn delete_history(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<StatusCode, ApiError> {
    state.history.delete_history(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_history_entry(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(note): Path<String>,
) -> Result<Json<HistoryEntryDto>, ApiError> {
    let entry = state
        .history
        .get_entry_by_note_id_or_alias(&note, &user)
        .await?;
    Ok(Json(state.history.to_history_entry_dto(&entry).await?))
}

/// Pin or unpin a history entry. Fails with 404 if the user has no entry.
pub async fn update_history_entry(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(note): Path<String>,
    Json(update): Json<HistoryEntryUpdateDto>,
) -> Result<Json<HistoryEntryDto>, ApiError> {
    let entry = state
        .history
        .update_history_entry(&note, &user, update)
        .await?;
    Ok(Json(state.history.to_history_entry_dto(&entry).await?))
}

pub async fn delete_history_entry(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(note): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.history.delete_history_entry(&note, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
