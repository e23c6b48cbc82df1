//! In-memory repositories and media backend for service and router tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use hedgedoc_api::services::IssuedToken;
use hedgedoc_api::{AppConfig, AppState, Repositories};
use hedgedoc_core::*;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    identities: HashMap<Uuid, Identity>,
    tokens: HashMap<Uuid, AuthToken>,
    notes: HashMap<Uuid, Note>,
    permissions: Vec<NoteUserPermission>,
    media: HashMap<String, MediaUpload>,
    history: HashMap<(Uuid, Uuid), HistoryEntry>,
}

impl Tables {
    fn cascade_note(&mut self, note_id: Uuid) {
        self.media.retain(|_, m| m.note_id != note_id);
        self.history.retain(|(_, n), _| *n != note_id);
        self.permissions.retain(|p| p.note_id != note_id);
    }
}

/// One store implementing every repository trait, with the same cascades
/// as the SQL schema.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            users: Arc::new(self.clone()),
            identities: Arc::new(self.clone()),
            auth_tokens: Arc::new(self.clone()),
            notes: Arc::new(self.clone()),
            media: Arc::new(self.clone()),
            history: Arc::new(self.clone()),
        }
    }

    pub fn history_count(&self) -> usize {
        self.tables.lock().unwrap().history.len()
    }

    pub fn media_count(&self) -> usize {
        self.tables.lock().unwrap().media.len()
    }

    /// Overwrite the stored timestamp of an entry, simulating an older visit.
    pub fn set_history_timestamp(&self, user_id: Uuid, note_id: Uuid, at: DateTime<Utc>) {
        if let Some(entry) = self.tables.lock().unwrap().history.get_mut(&(user_id, note_id)) {
            entry.updated_at = at;
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, req: CreateUserRequest) -> Result<User> {
        let mut t = self.tables.lock().unwrap();
        if t.users.values().any(|u| u.username == req.username) {
            return Err(Error::AlreadyInDb(format!("User '{}' exists", req.username)));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            username: req.username,
            display_name: req.display_name,
            email: req.email,
            photo: None,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User> {
        self.tables
            .lock()
            .unwrap()
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotInDb(format!("User '{}' not found", id)))
    }

    async fn get_by_username(&self, username: &str) -> Result<User> {
        self.tables
            .lock()
            .unwrap()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| Error::NotInDb(format!("User '{}' not found", username)))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut t = self.tables.lock().unwrap();
        if t.users.remove(&id).is_none() {
            return Err(Error::NotInDb(format!("User '{}' not found", id)));
        }
        t.identities.retain(|_, i| i.user_id != id);
        t.tokens.retain(|_, tok| tok.user_id != id);
        let owned: Vec<Uuid> = t
            .notes
            .values()
            .filter(|n| n.owner_id == id)
            .map(|n| n.id)
            .collect();
        for note_id in owned {
            t.notes.remove(&note_id);
            t.cascade_note(note_id);
        }
        t.media.retain(|_, m| m.user_id != id);
        t.history.retain(|(u, _), _| *u != id);
        t.permissions.retain(|p| p.user_id != id);
        Ok(())
    }
}

#[async_trait]
impl IdentityRepository for MemoryStore {
    async fn create(&self, identity: NewIdentity) -> Result<Identity> {
        identity.validate()?;
        let now = Utc::now();
        let record = Identity {
            id: Uuid::now_v7(),
            user_id: identity.user_id,
            provider_type: identity.provider_type,
            provider_name: identity.provider_name,
            sync_source: identity.sync_source,
            provider_user_id: identity.provider_user_id,
            o_auth_access_token: identity.o_auth_access_token,
            password_hash: identity.password_hash,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .lock()
            .unwrap()
            .identities
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Identity>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .identities
            .values()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_for_provider(
        &self,
        user_id: Uuid,
        provider_type: ProviderType,
    ) -> Result<Option<Identity>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .identities
            .values()
            .find(|i| i.user_id == user_id && i.provider_type == provider_type)
            .cloned())
    }

    async fn update_password_hash(&self, identity_id: Uuid, password_hash: &str) -> Result<()> {
        let mut t = self.tables.lock().unwrap();
        let identity = t
            .identities
            .get_mut(&identity_id)
            .filter(|i| i.provider_type == ProviderType::Local)
            .ok_or_else(|| Error::NotInDb(format!("Identity '{}' not found", identity_id)))?;
        identity.password_hash = Some(password_hash.to_string());
        identity.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl AuthTokenRepository for MemoryStore {
    async fn create(
        &self,
        user_id: Uuid,
        key_id: &str,
        label: &str,
        hash: &str,
        valid_until: DateTime<Utc>,
    ) -> Result<AuthToken> {
        let token = AuthToken {
            id: Uuid::now_v7(),
            key_id: key_id.to_string(),
            user_id,
            label: label.to_string(),
            hash: hash.to_string(),
            valid_until,
            last_used: None,
            created_at: Utc::now(),
        };
        self.tables
            .lock()
            .unwrap()
            .tokens
            .insert(token.id, token.clone());
        Ok(token)
    }

    async fn get_by_key_id(&self, key_id: &str) -> Result<AuthToken> {
        self.tables
            .lock()
            .unwrap()
            .tokens
            .values()
            .find(|t| t.key_id == key_id)
            .cloned()
            .ok_or_else(|| Error::NotInDb(format!("Token '{}' not found", key_id)))
    }

    async fn touch_last_used(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(token) = self.tables.lock().unwrap().tokens.get_mut(&id) {
            token.last_used = Some(at);
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<AuthToken>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .tokens
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotInDb(format!("Token '{}' not found", id)))
    }
}

#[async_trait]
impl NoteRepository for MemoryStore {
    async fn create(&self, req: CreateNoteRequest) -> Result<Note> {
        let mut t = self.tables.lock().unwrap();
        if let Some(alias) = &req.alias {
            if t.notes.values().any(|n| n.alias.as_ref() == Some(alias)) {
                return Err(Error::AlreadyInDb(format!("Alias '{}' is taken", alias)));
            }
        }
        let mut tags = req.tags;
        tags.sort();
        tags.dedup();
        let now = Utc::now();
        let note = Note {
            id: Uuid::now_v7(),
            alias: req.alias,
            owner_id: req.owner_id,
            title: req.title,
            description: req.description,
            content: req.content,
            tags,
            created_at: now,
            updated_at: now,
        };
        t.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Note> {
        self.tables
            .lock()
            .unwrap()
            .notes
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::note_not_found(&id.to_string()))
    }

    async fn get_by_id_or_alias(&self, id_or_alias: &str) -> Result<Note> {
        self.tables
            .lock()
            .unwrap()
            .notes
            .values()
            .find(|n| n.alias.as_deref() == Some(id_or_alias) || n.id.to_string() == id_or_alias)
            .cloned()
            .ok_or_else(|| Error::note_not_found(id_or_alias))
    }

    async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Note>> {
        let t = self.tables.lock().unwrap();
        Ok(ids.iter().filter_map(|id| t.notes.get(id).cloned()).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut t = self.tables.lock().unwrap();
        if t.notes.remove(&id).is_none() {
            return Err(Error::note_not_found(&id.to_string()));
        }
        t.cascade_note(id);
        Ok(())
    }

    async fn set_tags(&self, id: Uuid, tags: &[String]) -> Result<()> {
        let mut t = self.tables.lock().unwrap();
        let note = t
            .notes
            .get_mut(&id)
            .ok_or_else(|| Error::note_not_found(&id.to_string()))?;
        let mut tags = tags.to_vec();
        tags.sort();
        tags.dedup();
        note.tags = tags;
        Ok(())
    }

    async fn grant_user_permission(&self, note_id: Uuid, user_id: Uuid, can_edit: bool) -> Result<()> {
        let mut t = self.tables.lock().unwrap();
        t.permissions
            .retain(|p| !(p.note_id == note_id && p.user_id == user_id));
        t.permissions.push(NoteUserPermission {
            note_id,
            user_id,
            can_edit,
        });
        Ok(())
    }

    async fn list_user_permissions(&self, note_id: Uuid) -> Result<Vec<NoteUserPermission>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .permissions
            .iter()
            .filter(|p| p.note_id == note_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MediaUploadRepository for MemoryStore {
    async fn insert(&self, upload: &MediaUpload) -> Result<()> {
        let mut t = self.tables.lock().unwrap();
        if t.media.contains_key(&upload.id) {
            return Err(Error::AlreadyInDb(format!("Upload '{}' exists", upload.id)));
        }
        t.media.insert(upload.id.clone(), upload.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<MediaUpload> {
        self.tables
            .lock()
            .unwrap()
            .media
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotInDb(format!("MediaUpload with id '{}' not found", id)))
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<MediaUpload>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .media
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_by_note(&self, note_id: Uuid) -> Result<Vec<MediaUpload>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .media
            .values()
            .filter(|m| m.note_id == note_id)
            .cloned()
            .collect())
    }

    async fn list_removed_with_user(&self, user_id: Uuid) -> Result<Vec<MediaUpload>> {
        let t = self.tables.lock().unwrap();
        Ok(t.media
            .values()
            .filter(|m| {
                m.user_id == user_id
                    || t.notes.get(&m.note_id).map(|n| n.owner_id) == Some(user_id)
            })
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .media
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotInDb(format!("MediaUpload with id '{}' not found", id)))
    }
}

#[async_trait]
impl HistoryRepository for MemoryStore {
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<HistoryEntry>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .history
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find(&self, user_id: Uuid, note_id: Uuid) -> Result<Option<HistoryEntry>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .history
            .get(&(user_id, note_id))
            .cloned())
    }

    async fn insert(&self, entry: &HistoryEntry) -> Result<HistoryEntry> {
        let mut t = self.tables.lock().unwrap();
        let stored = t
            .history
            .entry((entry.user_id, entry.note_id))
            .and_modify(|existing| existing.touch(entry.updated_at))
            .or_insert_with(|| entry.clone());
        Ok(stored.clone())
    }

    async fn update(&self, entry: &HistoryEntry) -> Result<HistoryEntry> {
        let mut t = self.tables.lock().unwrap();
        let existing = t
            .history
            .get_mut(&(entry.user_id, entry.note_id))
            .ok_or_else(|| Error::NotInDb("No history entry".to_string()))?;
        existing.pin_status = entry.pin_status;
        existing.touch(entry.updated_at);
        Ok(existing.clone())
    }

    async fn delete(&self, user_id: Uuid, note_id: Uuid) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .history
            .remove(&(user_id, note_id))
            .map(|_| ())
            .ok_or_else(|| Error::NotInDb("No history entry".to_string()))
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let mut t = self.tables.lock().unwrap();
        let before = t.history.len();
        t.history.retain(|(u, _), _| *u != user_id);
        Ok((before - t.history.len()) as u64)
    }
}

/// Media backend keeping files in memory. Can be switched to fail.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.files.lock().unwrap().contains_key(file_name)
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaBackend for MemoryBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Filesystem
    }

    async fn save_file(&self, buffer: &[u8], file_name: &str) -> Result<(String, Option<String>)> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::MediaBackend(format!("Could not save '/srv/{}'", file_name)));
        }
        self.files
            .lock()
            .unwrap()
            .insert(file_name.to_string(), buffer.to_vec());
        Ok((format!("http://localhost:3000/uploads/{}", file_name), None))
    }

    async fn delete_file(&self, file_name: &str, _backend_data: Option<&str>) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::MediaBackend(format!("Could not delete '/srv/{}'", file_name)));
        }
        self.files
            .lock()
            .unwrap()
            .remove(file_name)
            .map(|_| ())
            .ok_or_else(|| Error::MediaBackend(format!("Could not delete '{}'", file_name)))
    }
}

/// A PNG signature followed by an IHDR chunk header; enough for detection.
pub const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];

/// Fully wired application over the in-memory store.
pub struct TestApp {
    pub store: MemoryStore,
    pub backend: MemoryBackend,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let backend = MemoryBackend::default();
        let config = AppConfig::from_lookup(|_| None).expect("default config");
        let state = AppState::new(config, store.repositories(), Arc::new(backend.clone()));
        Self {
            store,
            backend,
            state,
        }
    }

    pub fn router(&self) -> axum::Router {
        hedgedoc_api::router(self.state.clone())
    }

    /// Create a user and a token for them.
    pub async fn user_with_token(&self, username: &str) -> (User, IssuedToken) {
        let user = self
            .state
            .users
            .create_user(username, "", None)
            .await
            .expect("create user");
        let token = self
            .state
            .auth
            .issue_token(&user, "test", None)
            .await
            .expect("issue token");
        (user, token)
    }

    pub async fn note(&self, owner: &User, alias: Option<&str>, content: &str) -> Note {
        self.state
            .notes
            .create_note(owner, content.to_string(), alias.map(String::from))
            .await
            .expect("create note")
    }
}

/// Build a request with a bearer token.
pub fn authed(method: &str, uri: &str, token: &IssuedToken) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token.secret))
}

/// Multipart body with a single `file` field.
pub fn multipart_upload(
    token: &IssuedToken,
    note: Option<&str>,
    bytes: &[u8],
) -> Request<Body> {
    let boundary = "hedgedoc-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"image.png\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    let mut builder = authed("POST", "/media", token).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", boundary),
    );
    if let Some(note) = note {
        builder = builder.header("HedgeDoc-Note", note);
    }
    builder.body(Body::from(body)).expect("request")
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
