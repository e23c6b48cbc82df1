//! # hedgedoc-api
//!
//! HTTP API for the hedgedoc backend: token-guarded endpoints for notes,
//! media uploads, the user's profile and their note history.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use uuid::Uuid;

use hedgedoc_core::{
    defaults, AuthTokenRepository, HistoryRepository, IdentityRepository, MediaBackend,
    MediaUploadRepository, NoteRepository, UserRepository,
};
use hedgedoc_db::Database;

pub use auth::RequireUser;
pub use config::{AppConfig, ConfigError};
pub use error::ApiError;
use services::{AuthService, HistoryService, MediaService, NoteService, UserService};

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Repository handles the services are built from.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub identities: Arc<dyn IdentityRepository>,
    pub auth_tokens: Arc<dyn AuthTokenRepository>,
    pub notes: Arc<dyn NoteRepository>,
    pub media: Arc<dyn MediaUploadRepository>,
    pub history: Arc<dyn HistoryRepository>,
}

impl Repositories {
    pub fn from_database(db: &Database) -> Self {
        Self {
            users: Arc::new(db.users.clone()),
            identities: Arc::new(db.identities.clone()),
            auth_tokens: Arc::new(db.auth_tokens.clone()),
            notes: Arc::new(db.notes.clone()),
            media: Arc::new(db.media.clone()),
            history: Arc::new(db.history.clone()),
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
    pub users: UserService,
    pub notes: NoteService,
    pub media: MediaService,
    pub history: HistoryService,
}

impl AppState {
    pub fn new(config: AppConfig, repos: Repositories, backend: Arc<dyn MediaBackend>) -> Self {
        let notes = NoteService::new(
            repos.notes.clone(),
            repos.users.clone(),
            repos.media.clone(),
            backend.clone(),
        );
        Self {
            config: Arc::new(config),
            auth: AuthService::new(repos.auth_tokens.clone(), repos.users.clone()),
            users: UserService::new(
                repos.users.clone(),
                repos.identities.clone(),
                repos.media.clone(),
                backend.clone(),
            ),
            media: MediaService::new(
                repos.media.clone(),
                repos.notes.clone(),
                repos.users.clone(),
                backend,
                notes.clone(),
            ),
            history: HistoryService::new(repos.history.clone(), repos.notes.clone()),
            notes,
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;
    let uploads = ServeDir::new(&state.config.media_upload_path);

    Router::new()
        .route("/health", get(handlers::health_check))
        // Media
        .route("/media", post(handlers::media::upload_media))
        .route("/media/:filename", delete(handlers::media::delete_media))
        // Me
        .route(
            "/me",
            get(handlers::me::get_me).delete(handlers::me::delete_me),
        )
        .route("/me/media", get(handlers::me::get_my_media))
        .route(
            "/me/history",
            get(handlers::history::get_history).delete(handlers::history::delete_history),
        )
        .route(
            "/me/history/:note",
            get(handlers::history::get_history_entry)
                .put(handlers::history::update_history_entry)
                .delete(handlers::history::delete_history_entry),
        )
        // Notes
        .route("/notes", post(handlers::notes::create_note))
        .route(
            "/notes/:note",
            get(handlers::notes::get_note)
                .post(handlers::notes::create_note_with_alias)
                .delete(handlers::notes::delete_note),
        )
        .route("/notes/:note/media", get(handlers::notes::get_note_media))
        .nest_service(defaults::MEDIA_PUBLIC_PATH, uploads)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}
