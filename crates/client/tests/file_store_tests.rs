//! Clients sharing a token file

use campus_client::{CampusClient, ClientError, Credentials, FileTokenStore, StateDir};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with_file(server: &MockServer, state_dir: &StateDir) -> CampusClient {
    CampusClient::builder()
        .base_url(format!("{}/api/v1/", server.uri()))
        .token_store(Arc::new(FileTokenStore::new(state_dir.tokens_path())))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_login_persists_for_next_client() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let state_dir = StateDir::with_override(temp_dir.path());

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A1", "refresh": "R1"})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/profile/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
        .expect(1)
        .mount(&server)
        .await;

    client_with_file(&server, &state_dir)
        .login("grace@state.edu", "correct horse")
        .await
        .unwrap();

    let next = client_with_file(&server, &state_dir);
    assert_eq!(
        next.session().credentials().await.unwrap(),
        Some(Credentials::new("A1", "R1"))
    );
    let profile: Value = next.get("users/profile/").await.unwrap();
    assert_eq!(profile["id"], 3);
}

#[tokio::test]
async fn test_refresh_by_one_client_is_seen_by_another() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let state_dir = StateDir::with_override(temp_dir.path());

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    let first = client_with_file(&server, &state_dir);
    let second = client_with_file(&server, &state_dir);
    first
        .session()
        .store_credentials(&Credentials::new("A1", "R1"))
        .await
        .unwrap();

    assert_eq!(first.refresh_access_token().await.unwrap(), "A2");
    assert_eq!(
        second.session().access_token().await.unwrap().as_deref(),
        Some("A2")
    );
}

#[tokio::test]
async fn test_expired_session_leaves_empty_token_file() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let state_dir = StateDir::with_override(temp_dir.path());

    Mock::given(method("GET"))
        .and(path("/api/v1/users/profile/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_file(&server, &state_dir);
    client
        .session()
        .store_credentials(&Credentials::new("OLD", "STALE"))
        .await
        .unwrap();

    let result = client.profile().await;
    assert!(matches!(result, Err(ClientError::SessionExpired(_))));

    let reopened = FileTokenStore::new(state_dir.tokens_path());
    let client = CampusClient::builder()
        .base_url(format!("{}/api/v1/", server.uri()))
        .token_store(Arc::new(reopened))
        .build()
        .unwrap();
    assert!(client.session().credentials().await.unwrap().is_none());
}
