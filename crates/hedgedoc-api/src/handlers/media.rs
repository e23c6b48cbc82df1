//! Media upload HTTP handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use hedgedoc_core::{defaults, Error, MediaUploadUrlDto};

use crate::{ApiError, AppState, RequireUser};

/// Name of the multipart field carrying the file.
const FILE_FIELD: &str = "file";

/// Upload a file and attach it to the note named in the `HedgeDoc-Note` header.
///
/// # Returns
/// - 201 Created with `{url}`
/// - 400 Bad Request if the header or file is missing, the note does not
///   exist, or the file type is not allowed
/// - 403 Forbidden if the user may not edit the note
/// - 500 Internal Server Error on media backend failures
pub async fn upload_media(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MediaUploadUrlDto>), ApiError> {
    let note_id_or_alias = headers
        .get(defaults::NOTE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest(format!("Missing {} header", defaults::NOTE_HEADER))
        })?
        .to_string();

    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some(FILE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Could not read file: {}", e)))?;
            file = Some(bytes);
            break;
        }
    }
    let file = file.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    let url = state
        .media
        .save_file(&file, &user, &note_id_or_alias)
        .await
        .map_err(upload_error)?;

    Ok((
        StatusCode::CREATED,
        Json(state.media.to_media_upload_url_dto(url)),
    ))
}

/// Uploads report a missing note as a bad request and a permission problem as forbidden.
fn upload_error(err: Error) -> ApiError {
    match err {
        Error::NotInDb(msg) | Error::Client(msg) => ApiError::BadRequest(msg),
        Error::Permission(msg) => ApiError::Forbidden(msg),
        other => other.into(),
    }
}

/// Delete an upload by file name.
///
/// # Returns
/// - 204 No Content
/// - 401 Unauthorized if the user did not upload the file
/// - 404 Not Found if no such upload exists
/// - 500 Internal Server Error on media backend failures
pub async fn delete_media(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(filename): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.media.delete_file_by_filename(&filename, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}
