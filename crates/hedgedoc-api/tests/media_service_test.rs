//! Media, note and user service behaviour over the in-memory store.

mod helpers;

use hedgedoc_core::{Error, MediaUpload};
use helpers::{TestApp, PNG_BYTES};

#[tokio::test]
async fn test_owner_can_upload_and_delete() {
    let app = TestApp::new();
    let (user, _) = app.user_with_token("alice").await;
    app.note(&user, Some("gallery"), "# Gallery").await;

    let url = app
        .state
        .media
        .save_file(PNG_BYTES, &user, "gallery")
        .await
        .unwrap();
    let file_name = url.rsplit('/').next().unwrap().to_string();
    assert!(MediaUpload::is_valid_id(&file_name));
    assert!(file_name.ends_with(".png"));
    assert!(app.backend.contains(&file_name));

    app.state
        .media
        .delete_file_by_filename(&file_name, &user)
        .await
        .unwrap();
    assert!(!app.backend.contains(&file_name));
    assert_eq!(app.store.media_count(), 0);
}

#[tokio::test]
async fn test_upload_to_unknown_note_is_not_found() {
    let app = TestApp::new();
    let (user, _) = app.user_with_token("alice").await;

    let err = app
        .state
        .media
        .save_file(PNG_BYTES, &user, "nowhere")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotInDb(_)));
    assert_eq!(app.backend.file_count(), 0);
}

#[tokio::test]
async fn test_upload_requires_write_permission() {
    let app = TestApp::new();
    let (owner, _) = app.user_with_token("alice").await;
    let (reader, _) = app.user_with_token("bob").await;
    let note = app.note(&owner, Some("shared"), "# Shared").await;

    app.state
        .notes
        .grant_user_permission(&owner, &note, &reader, false)
        .await
        .unwrap();
    let err = app
        .state
        .media
        .save_file(PNG_BYTES, &reader, "shared")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Permission(_)));

    app.state
        .notes
        .grant_user_permission(&owner, &note, &reader, true)
        .await
        .unwrap();
    assert!(app
        .state
        .media
        .save_file(PNG_BYTES, &reader, "shared")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_rejects_non_image_upload() {
    let app = TestApp::new();
    let (user, _) = app.user_with_token("alice").await;
    app.note(&user, Some("docs"), "# Docs").await;

    let err = app
        .state
        .media
        .save_file(b"plain text is not an image", &user, "docs")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Client(_)));
}

#[tokio::test]
async fn test_backend_failure_is_reported_and_nothing_is_recorded() {
    let app = TestApp::new();
    let (user, _) = app.user_with_token("alice").await;
    app.note(&user, Some("broken"), "# Broken").await;
    app.backend.set_failing(true);

    let err = app
        .state
        .media
        .save_file(PNG_BYTES, &user, "broken")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MediaBackend(_)));
    assert_eq!(app.store.media_count(), 0);
}

#[tokio::test]
async fn test_only_uploader_may_delete() {
    let app = TestApp::new();
    let (owner, _) = app.user_with_token("alice").await;
    let (other, _) = app.user_with_token("mallory").await;
    app.note(&owner, Some("mine"), "# Mine").await;

    let url = app
        .state
        .media
        .save_file(PNG_BYTES, &owner, "mine")
        .await
        .unwrap();
    let file_name = url.rsplit('/').next().unwrap();

    let err = app
        .state
        .media
        .delete_file_by_filename(file_name, &other)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Permission(_)));
    assert!(app.backend.contains(file_name));

    let err = app
        .state
        .media
        .delete_file_by_filename("0123456789abcdef0123456789abcdef.png", &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotInDb(_)));
}

#[tokio::test]
async fn test_media_dto_lists_uploader_and_note() {
    let app = TestApp::new();
    let (user, _) = app.user_with_token("alice").await;
    let note = app.note(&user, Some("album"), "# Album").await;
    let url = app
        .state
        .media
        .save_file(PNG_BYTES, &user, "album")
        .await
        .unwrap();

    let uploads = app.state.media.list_for_note(&note).await.unwrap();
    let dtos = app.state.media.to_media_upload_dtos(&uploads).await.unwrap();
    assert_eq!(dtos.len(), 1);
    assert_eq!(dtos[0].url, url);
    assert_eq!(dtos[0].note_id, "album");
    assert_eq!(dtos[0].user_name, "alice");
}

#[tokio::test]
async fn test_deleting_note_removes_stored_files() {
    let app = TestApp::new();
    let (user, _) = app.user_with_token("alice").await;
    let note = app.note(&user, Some("temp"), "# Temp").await;
    app.state
        .media
        .save_file(PNG_BYTES, &user, "temp")
        .await
        .unwrap();

    app.state.notes.delete_note(&user, &note).await.unwrap();
    assert_eq!(app.backend.file_count(), 0);
    assert_eq!(app.store.media_count(), 0);
}

#[tokio::test]
async fn test_only_owner_may_delete_note() {
    let app = TestApp::new();
    let (owner, _) = app.user_with_token("alice").await;
    let (other, _) = app.user_with_token("bob").await;
    let note = app.note(&owner, None, "# Keep").await;

    let err = app.state.notes.delete_note(&other, &note).await.unwrap_err();
    assert!(matches!(err, Error::Permission(_)));
}

#[tokio::test]
async fn test_deleting_user_cascades_everything() {
    let app = TestApp::new();
    let (user, token) = app.user_with_token("alice").await;
    let note = app.note(&user, Some("owned"), "# Owned").await;
    app.state
        .media
        .save_file(PNG_BYTES, &user, "owned")
        .await
        .unwrap();
    app.state
        .history
        .create_or_update_history_entry(&note, &user)
        .await
        .unwrap();

    app.state.users.delete_user(&user).await.unwrap();

    assert_eq!(app.backend.file_count(), 0);
    assert_eq!(app.store.media_count(), 0);
    assert_eq!(app.store.history_count(), 0);
    assert!(matches!(
        app.state.notes.get_note_by_id_or_alias("owned").await,
        Err(Error::NotInDb(_))
    ));
    assert!(matches!(
        app.state.auth.validate_token(&token.secret).await,
        Err(Error::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_alias_rules() {
    let app = TestApp::new();
    let (user, _) = app.user_with_token("alice").await;
    app.note(&user, Some("taken"), "# Taken").await;

    let err = app
        .state
        .notes
        .create_note(&user, String::new(), Some("taken".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyInDb(_)));

    let err = app
        .state
        .notes
        .create_note(&user, String::new(), Some("bad alias".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Client(_)));
}

#[tokio::test]
async fn test_local_password_flow() {
    let app = TestApp::new();
    let (user, _) = app.user_with_token("alice").await;

    app.state
        .users
        .add_local_identity(&user, "first-password")
        .await
        .unwrap();
    app.state
        .users
        .verify_password(&user, "first-password")
        .await
        .unwrap();

    app.state
        .users
        .update_password(&user, "second-password")
        .await
        .unwrap();
    assert!(matches!(
        app.state.users.verify_password(&user, "first-password").await,
        Err(Error::Unauthorized(_))
    ));
    app.state
        .users
        .verify_password(&user, "second-password")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_token_validation_and_revocation() {
    let app = TestApp::new();
    let (user, token) = app.user_with_token("alice").await;

    let resolved = app.state.auth.validate_token(&token.secret).await.unwrap();
    assert_eq!(resolved.id, user.id);

    let (key_id, _) = token.secret.split_once('.').unwrap();
    let forged = format!("{}.{}", key_id, "00".repeat(32));
    assert!(matches!(
        app.state.auth.validate_token(&forged).await,
        Err(Error::Unauthorized(_))
    ));
    assert!(matches!(
        app.state.auth.validate_token("no-dot").await,
        Err(Error::Unauthorized(_))
    ));

    let listed = app.state.auth.list_tokens(&user).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].last_used.is_some());

    app.state.auth.revoke_token(&user, key_id).await.unwrap();
    assert!(matches!(
        app.state.auth.validate_token(&token.secret).await,
        Err(Error::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_token_validity_is_capped() {
    let app = TestApp::new();
    let (user, _) = app.user_with_token("alice").await;

    let issued = app
        .state
        .auth
        .issue_token(&user, "long", Some(10_000))
        .await
        .unwrap();
    let max = chrono::Utc::now() + chrono::Duration::days(730);
    assert!(issued.token.valid_until <= max);

    assert!(matches!(
        app.state.auth.issue_token(&user, "zero", Some(0)).await,
        Err(Error::Client(_))
    ));
}

#[tokio::test]
async fn test_deleting_owner_removes_files_others_attached() {
    let app = TestApp::new();
    let (owner, _) = app.user_with_token("alice").await;
    let (editor, _) = app.user_with_token("bob").await;
    let note = app.note(&owner, Some("shared"), "# Shared").await;
    app.state
        .notes
        .grant_user_permission(&owner, &note, &editor, true)
        .await
        .unwrap();
    let url = app
        .state
        .media
        .save_file(PNG_BYTES, &editor, "shared")
        .await
        .unwrap();
    let file_name = url.rsplit('/').next().unwrap().to_string();

    app.state.users.delete_user(&owner).await.unwrap();

    assert_eq!(app.store.media_count(), 0);
    assert!(!app.backend.contains(&file_name));
    // The editor's own account is untouched.
    assert!(app.state.users.get_by_username("bob").await.is_ok());
}
