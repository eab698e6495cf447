//! Session guard over HTTP with a file-backed session store.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use secrecy::SecretString;

use sealen_client::api::Credentials;
use sealen_client::session::SessionStore;
use sealen_client::{ClientError, FileSessionStore, Page, SessionGuard, SessionState, connect};
use sealen_core::{CertificationLevel, Email, Role};
use sealen_integration_tests::{PASSWORD, StubApi};

fn temp_session_file() -> PathBuf {
    std::env::temp_dir()
        .join(format!("sealen-it-{}", uuid::Uuid::new_v4()))
        .join("session.json")
}

fn credentials(email: &str, password: &str) -> Credentials {
    Credentials {
        email: Email::parse(email).unwrap(),
        password: SecretString::from(password.to_string()),
    }
}

#[tokio::test]
async fn test_restore_without_session_file_makes_no_requests() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();
    let mut guard = SessionGuard::new(FileSessionStore::new(temp_session_file()));

    let state = guard.restore(&api).await;

    assert!(matches!(state, SessionState::Unauthenticated));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn test_session_survives_restart() {
    let stub = StubApi::spawn().await;
    let config = stub.config(&temp_session_file()).unwrap();
    let api = connect(&config).unwrap();

    let mut first = SessionGuard::new(FileSessionStore::new(&config.session_file));
    first
        .login(api.as_ref(), &credentials("customer@sealen.test", PASSWORD))
        .await
        .unwrap();
    assert_eq!(first.certification(), CertificationLevel::new(25));
    assert!(config.session_file.exists());

    // A new process: only the file carries over
    let mut second = SessionGuard::new(FileSessionStore::new(&config.session_file));
    second.restore(api.as_ref()).await;

    let user = second.current_user().unwrap();
    assert_eq!(user.role, Role::Customer);
    assert_eq!(user.full_name, "Sari Customer");
    assert!(stub.request_log().contains(&"GET /api/auth/me".to_string()));
}

#[tokio::test]
async fn test_rejected_token_is_cleared_silently() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();
    let path = temp_session_file();

    let mut guard = SessionGuard::new(FileSessionStore::new(&path));
    guard
        .login(&api, &credentials("operator@sealen.test", PASSWORD))
        .await
        .unwrap();

    stub.revoke_tokens();

    let mut restarted = SessionGuard::new(FileSessionStore::new(&path));
    let state = restarted.restore(&api).await;

    assert!(matches!(state, SessionState::Unauthenticated));
    assert!(restarted.store().load().unwrap().is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_failed_login_keeps_previous_state() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();
    let mut guard = SessionGuard::new(FileSessionStore::new(temp_session_file()));

    let err = guard
        .login(&api, &credentials("customer@sealen.test", "nope"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Api(ref e) if e.is_unauthorized()));
    assert!(!guard.is_authenticated());
    assert!(guard.store().load().unwrap().is_none());
}

#[tokio::test]
async fn test_renew_token_replaces_access_token() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();
    let path = temp_session_file();

    let mut guard = SessionGuard::new(FileSessionStore::new(&path));
    guard
        .login(&api, &credentials("customer@sealen.test", PASSWORD))
        .await
        .unwrap();
    stub.revoke_tokens();

    guard.renew_token(&api).await.unwrap();
    guard.refresh_user(&api).await.unwrap();

    let mut restarted = SessionGuard::new(FileSessionStore::new(&path));
    restarted.restore(&api).await;
    assert!(restarted.is_authenticated());
}

#[tokio::test]
async fn test_logout_clears_file_even_if_server_fails() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();
    let path = temp_session_file();

    let mut guard = SessionGuard::new(FileSessionStore::new(&path));
    guard
        .login(&api, &credentials("admin@sealen.test", PASSWORD))
        .await
        .unwrap();

    stub.fail_next(sealen_integration_tests::Failure::new(
        axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({ "error": "boom" }),
    ));
    guard.logout(&api).await;

    assert!(!guard.is_authenticated());
    assert!(!path.exists());
}

#[tokio::test]
async fn test_protected_page_remembers_destination() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();
    let mut guard = SessionGuard::new(FileSessionStore::new(temp_session_file()));
    guard.restore(&api).await;

    let navigation = guard.authorize(Page::Rent);
    assert_eq!(navigation.destination(), Page::Login);

    guard
        .login(&api, &credentials("customer@sealen.test", PASSWORD))
        .await
        .unwrap();
    assert_eq!(guard.take_return_to::<Page>(), Some(Page::Rent));
    assert_eq!(guard.take_return_to::<Page>(), None);
}

#[tokio::test]
async fn test_return_location_survives_restart() {
    let stub = StubApi::spawn().await;
    let api = stub.http_api();
    let path = temp_session_file();

    // Logged out: the redirect is written to the session file
    let mut first = SessionGuard::new(FileSessionStore::new(&path));
    first.restore(&api).await;
    first.authorize(Page::Certification);
    assert!(path.exists());
    assert!(stub.requests().is_empty());

    let mut second = SessionGuard::new(FileSessionStore::new(&path));
    second.restore(&api).await;
    second
        .login(&api, &credentials("customer@sealen.test", PASSWORD))
        .await
        .unwrap();
    assert_eq!(second.take_return_to::<Page>(), Some(Page::Certification));

    let mut third = SessionGuard::new(FileSessionStore::new(&path));
    third.restore(&api).await;
    assert!(third.is_authenticated());
    assert_eq!(third.take_return_to::<Page>(), None);
}
