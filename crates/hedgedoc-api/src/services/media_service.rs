//! Media upload handling.
//!
//! Uploads are stored by the configured [`MediaBackend`] under a random id and
//! recorded in the media repository. Only images on the allow-list are
//! accepted; the type is detected from the file's magic bytes, never from the
//! client-supplied name or content type.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use hedgedoc_core::{
    defaults, Error, MediaBackend, MediaUpload, MediaUploadDto, MediaUploadRepository,
    MediaUploadUrlDto, Note, NoteRepository, Result, User, UserRepository,
};

use super::NoteService;

/// Detected type of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedType {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

/// Detect the file type from magic bytes and check it against the allow-list.
pub fn detect_allowed_type(buffer: &[u8]) -> Result<DetectedType> {
    let kind = infer::get(buffer)
        .ok_or_else(|| Error::Client("Could not detect file type.".to_string()))?;
    if !defaults::ALLOWED_MEDIA_MIME_TYPES.contains(&kind.mime_type()) {
        return Err(Error::Client("MIME type not allowed.".to_string()));
    }
    Ok(DetectedType {
        mime_type: kind.mime_type(),
        extension: kind.extension(),
    })
}

#[derive(Clone)]
pub struct MediaService {
    media: Arc<dyn MediaUploadRepository>,
    notes: Arc<dyn NoteRepository>,
    users: Arc<dyn UserRepository>,
    backend: Arc<dyn MediaBackend>,
    note_service: NoteService,
}

impl MediaService {
    pub fn new(
        media: Arc<dyn MediaUploadRepository>,
        notes: Arc<dyn NoteRepository>,
        users: Arc<dyn UserRepository>,
        backend: Arc<dyn MediaBackend>,
        note_service: NoteService,
    ) -> Self {
        Self {
            media,
            notes,
            users,
            backend,
            note_service,
        }
    }

    /// Store an upload for the note identified by `note_id_or_alias` and
    /// return its public URL.
    pub async fn save_file(
        &self,
        buffer: &[u8],
        user: &User,
        note_id_or_alias: &str,
    ) -> Result<String> {
        let note = self.notes.get_by_id_or_alias(note_id_or_alias).await?;
        if !self.note_service.may_write(user, &note).await? {
            return Err(Error::Permission(format!(
                "User '{}' may not upload media to note '{}'",
                user.username, note_id_or_alias
            )));
        }

        let detected = detect_allowed_type(buffer)?;
        let id = MediaUpload::generate_id(detected.extension);
        let (file_url, backend_data) = self.backend.save_file(buffer, &id).await?;

        let upload = MediaUpload {
            id,
            note_id: note.id,
            user_id: user.id,
            backend_type: self.backend.backend_type(),
            file_url,
            backend_data,
            created_at: Utc::now(),
        };

        if let Err(e) = self.media.insert(&upload).await {
            // Keep the backend free of files nothing points to.
            if let Err(cleanup) = self
                .backend
                .delete_file(&upload.id, upload.backend_data.as_deref())
                .await
            {
                warn!(
                    subsystem = "media",
                    media_id = %upload.id,
                    error = %cleanup,
                    "Could not remove file after failed insert"
                );
            }
            return Err(e);
        }

        info!(
            subsystem = "media",
            op = "upload",
            media_id = %upload.id,
            note_id = %note.id,
            user_id = %user.id,
            size_bytes = buffer.len(),
            mime_type = detected.mime_type,
            "Media uploaded"
        );
        Ok(upload.file_url)
    }

    /// Delete an upload by its file name. Only the uploader may do so.
    pub async fn delete_file_by_filename(&self, filename: &str, user: &User) -> Result<()> {
        let upload = self.media.get(filename).await?;
        if upload.user_id != user.id {
            warn!(
                subsystem = "media",
                op = "delete",
                media_id = %filename,
                user_id = %user.id,
                "Refused to delete media uploaded by another user"
            );
            return Err(Error::Permission(format!(
                "File '{}' is not owned by '{}'",
                filename, user.username
            )));
        }
        self.delete_upload(&upload).await
    }

    async fn delete_upload(&self, upload: &MediaUpload) -> Result<()> {
        self.backend
            .delete_file(&upload.id, upload.backend_data.as_deref())
            .await?;
        self.media.delete(&upload.id).await?;
        info!(subsystem = "media", op = "delete", media_id = %upload.id, "Media deleted");
        Ok(())
    }

    pub async fn list_for_user(&self, user: &User) -> Result<Vec<MediaUpload>> {
        self.media.list_by_user(user.id).await
    }

    pub async fn list_for_note(&self, note: &Note) -> Result<Vec<MediaUpload>> {
        self.media.list_by_note(note.id).await
    }

    pub async fn to_media_upload_dto(&self, upload: &MediaUpload) -> Result<MediaUploadDto> {
        let note = self.notes.get_by_id(upload.note_id).await?;
        let uploader = self.users.get_by_id(upload.user_id).await?;
        Ok(MediaUploadDto {
            url: upload.file_url.clone(),
            note_id: note.identifier(),
            created_at: upload.created_at,
            user_name: uploader.username,
        })
    }

    pub async fn to_media_upload_dtos(&self, uploads: &[MediaUpload]) -> Result<Vec<MediaUploadDto>> {
        let mut dtos = Vec::with_capacity(uploads.len());
        for upload in uploads {
            dtos.push(self.to_media_upload_dto(upload).await?);
        }
        Ok(dtos)
    }

    pub fn to_media_upload_url_dto(&self, url: String) -> MediaUploadUrlDto {
        MediaUploadUrlDto { url }
    }
}
