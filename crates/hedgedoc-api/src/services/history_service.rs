//! Per-user note history.
//!
//! An entry exists at most once per (user, note) pair. Its timestamp is only
//! ever moved forward; pinning is the only other mutable field.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use hedgedoc_core::{
    Error, HistoryEntry, HistoryEntryDto, HistoryEntryUpdateDto, HistoryRepository, Note,
    NoteRepository, Result, User,
};

#[derive(Clone)]
pub struct HistoryService {
    history: Arc<dyn HistoryRepository>,
    notes: Arc<dyn NoteRepository>,
}

impl HistoryService {
    pub fn new(history: Arc<dyn HistoryRepository>, notes: Arc<dyn NoteRepository>) -> Self {
        Self { history, notes }
    }

    /// All entries of `user`, in no particular order.
    pub async fn get_entries_by_user(&self, user: &User) -> Result<Vec<HistoryEntry>> {
        self.history.list_by_user(user.id).await
    }

    /// The entry of `user` for the note identified by `id_or_alias`.
    pub async fn get_entry_by_note_id_or_alias(
        &self,
        id_or_alias: &str,
        user: &User,
    ) -> Result<HistoryEntry> {
        let note = self.notes.get_by_id_or_alias(id_or_alias).await?;
        self.get_entry_by_note(&note, user).await
    }

    async fn get_entry_by_note(&self, note: &Note, user: &User) -> Result<HistoryEntry> {
        self.history
            .find(user.id, note.id)
            .await?
            .ok_or_else(|| missing_entry(&note.identifier(), user))
    }

    /// Record a visit: bump the timestamp of an existing entry or create one.
    pub async fn create_or_update_history_entry(
        &self,
        note: &Note,
        user: &User,
    ) -> Result<HistoryEntry> {
        let now = Utc::now();
        match self.history.find(user.id, note.id).await? {
            Some(mut entry) => {
                entry.touch(now);
                self.history.update(&entry).await
            }
            None => {
                debug!(
                    subsystem = "history",
                    op = "create",
                    note_id = %note.id,
                    user_id = %user.id,
                    "Creating history entry"
                );
                self.history
                    .insert(&HistoryEntry::new(user.id, note.id, now))
                    .await
            }
        }
    }

    /// Change the pin status of an existing entry. Never creates one.
    pub async fn update_history_entry(
        &self,
        id_or_alias: &str,
        user: &User,
        update: HistoryEntryUpdateDto,
    ) -> Result<HistoryEntry> {
        let mut entry = self.get_entry_by_note_id_or_alias(id_or_alias, user).await?;
        entry.pin_status = update.pin_status;
        entry.touch(Utc::now());
        self.history.update(&entry).await
    }

    pub async fn delete_history_entry(&self, id_or_alias: &str, user: &User) -> Result<()> {
        let note = self.notes.get_by_id_or_alias(id_or_alias).await?;
        let entry = self.get_entry_by_note(&note, user).await?;
        self.history.delete(entry.user_id, entry.note_id).await
    }

    /// Remove the whole history of `user`. An empty history is not an error.
    pub async fn delete_history(&self, user: &User) -> Result<()> {
        let removed = self.history.delete_all_for_user(user.id).await?;
        debug!(
            subsystem = "history",
            op = "delete_all",
            user_id = %user.id,
            result_count = removed,
            "History cleared"
        );
        Ok(())
    }

    pub async fn to_history_entry_dto(&self, entry: &HistoryEntry) -> Result<HistoryEntryDto> {
        let note = self.notes.get_by_id(entry.note_id).await?;
        Ok(HistoryEntryDto::from_parts(entry, &note))
    }

    /// DTOs for the whole history of `user`, most recent first.
    pub async fn list_dtos(&self, user: &User) -> Result<Vec<HistoryEntryDto>> {
        let mut entries = self.history.list_by_user(user.id).await?;
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let ids: Vec<_> = entries.iter().map(|e| e.note_id).collect();
        let notes: HashMap<_, _> = self
            .notes
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|n| (n.id, n))
            .collect();

        Ok(entries
            .iter()
            .filter_map(|entry| {
                notes
                    .get(&entry.note_id)
                    .map(|note| HistoryEntryDto::from_parts(entry, note))
            })
            .collect())
    }
}

fn missing_entry(identifier: &str, user: &User) -> Error {
    Error::NotInDb(format!(
        "User '{}' has no history entry for note '{}'",
        user.username, identifier
    ))
}
