//! Note creation, lookup, deletion and permission checks.

use std::sync::Arc;

use tracing::{info, warn};

use hedgedoc_core::{
    CreateNoteRequest, Error, MediaBackend, MediaUploadRepository, Note, NoteDto, NoteRepository,
    Result, User, UserRepository,
};

#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
    users: Arc<dyn UserRepository>,
    media: Arc<dyn MediaUploadRepository>,
    backend: Arc<dyn MediaBackend>,
}

impl NoteService {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        users: Arc<dyn UserRepository>,
        media: Arc<dyn MediaUploadRepository>,
        backend: Arc<dyn MediaBackend>,
    ) -> Self {
        Self {
            notes,
            users,
            media,
            backend,
        }
    }

    /// Create a note owned by `owner`. The title comes from the first heading.
    pub async fn create_note(
        &self,
        owner: &User,
        content: String,
        alias: Option<String>,
    ) -> Result<Note> {
        if let Some(alias) = &alias {
            Note::validate_alias(alias)?;
        }
        let note = self
            .notes
            .create(CreateNoteRequest {
                owner_id: owner.id,
                alias,
                title: Note::title_from_content(&content),
                description: String::new(),
                content,
                tags: Vec::new(),
            })
            .await?;

        info!(
            subsystem = "notes",
            op = "create",
            note_id = %note.id,
            user_id = %owner.id,
            "Note created"
        );
        Ok(note)
    }

    pub async fn get_note_by_id_or_alias(&self, id_or_alias: &str) -> Result<Note> {
        self.notes.get_by_id_or_alias(id_or_alias).await
    }

    /// Resolve a note and require read access to it.
    pub async fn get_readable_note(&self, user: &User, id_or_alias: &str) -> Result<Note> {
        let note = self.notes.get_by_id_or_alias(id_or_alias).await?;
        if !self.may_read(user, &note).await? {
            return Err(Error::Permission(format!(
                "User '{}' may not read note '{}'",
                user.username, id_or_alias
            )));
        }
        Ok(note)
    }

    /// Owner or any user grant.
    pub async fn may_read(&self, user: &User, note: &Note) -> Result<bool> {
        if note.owner_id == user.id {
            return Ok(true);
        }
        let grants = self.notes.list_user_permissions(note.id).await?;
        Ok(grants.iter().any(|g| g.user_id == user.id))
    }

    /// Owner or a user grant with `can_edit`.
    pub async fn may_write(&self, user: &User, note: &Note) -> Result<bool> {
        if note.owner_id == user.id {
            return Ok(true);
        }
        let grants = self.notes.list_user_permissions(note.id).await?;
        Ok(grants.iter().any(|g| g.user_id == user.id && g.can_edit))
    }

    /// Grant `target` access to a note owned by `owner`.
    pub async fn grant_user_permission(
        &self,
        owner: &User,
        note: &Note,
        target: &User,
        can_edit: bool,
    ) -> Result<()> {
        if note.owner_id != owner.id {
            return Err(Error::Permission(format!(
                "Only the owner may share note '{}'",
                note.identifier()
            )));
        }
        self.notes
            .grant_user_permission(note.id, target.id, can_edit)
            .await
    }

    /// Delete a note. Only its owner may do so.
    ///
    /// Stored bytes of attached uploads are removed first; the upload rows,
    /// history entries, tags and grants go with the note row.
    pub async fn delete_note(&self, user: &User, note: &Note) -> Result<()> {
        if note.owner_id != user.id {
            return Err(Error::Permission(format!(
                "Only the owner may delete note '{}'",
                note.identifier()
            )));
        }

        for upload in self.media.list_by_note(note.id).await? {
            if let Err(e) = self
                .backend
                .delete_file(&upload.id, upload.backend_data.as_deref())
                .await
            {
                warn!(
                    subsystem = "notes",
                    op = "delete",
                    note_id = %note.id,
                    media_id = %upload.id,
                    error = %e,
                    "Could not remove media file of deleted note"
                );
            }
        }

        self.notes.delete(note.id).await?;
        info!(subsystem = "notes", op = "delete", note_id = %note.id, "Note deleted");
        Ok(())
    }

    pub async fn to_note_dto(&self, note: &Note) -> Result<NoteDto> {
        let owner = self.users.get_by_id(note.owner_id).await?;
        Ok(NoteDto {
            id: note.id,
            alias: note.alias.clone(),
            title: note.title.clone(),
            description: note.description.clone(),
            content: note.content.clone(),
            tags: note.tags.clone(),
            owner: owner.username,
            created_at: note.created_at,
            updated_at: note.updated_at,
        })
    }
}
