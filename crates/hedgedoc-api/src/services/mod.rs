//! Service layer for business logic.

pub mod auth_service;
pub mod history_service;
pub mod media_service;
pub mod note_service;
pub mod user_service;

pub use auth_service::{AuthService, IssuedToken};
pub use history_service::HistoryService;
pub use media_service::MediaService;
pub use note_service::NoteService;
pub use user_service::UserService;
