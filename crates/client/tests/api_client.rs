//! End-to-end tests for `ApiClient` against a live server on the in-memory
//! backend.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use tally_api::auth::jwt::JwtConfig;
use tally_api::auth::password::hash_password;
use tally_api::config::{ServerConfig, StorageBackend};
use tally_api::router::build_app_router;
use tally_api::state::AppState;
use tally_client::models::NewClient;
use tally_client::{new_staging_key, ApiClient, AuthState, ClientError};
use tally_core::client_status::ClientDisplayStatus;
use tally_core::roles::Role;
use tally_db::models::entity::CreateEntity;
use tally_db::models::journal_entry::CreateJournalEntry;
use tally_db::models::user::{CreateUser, User};
use tally_db::Storage;

const PASSWORD: &str = "correct-horse-battery";

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        storage: StorageBackend::Memory,
        max_upload_bytes: 1024,
        staged_file_ttl_hours: 24,
        cookie_secure: false,
        bootstrap_admin: None,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
    }
}

async fn seed_user(storage: &Storage, username: &str, role: Role) -> User {
    storage
        .create_user(&CreateUser {
            username: username.to_string(),
            email: format!("{username}@test.com"),
            password_hash: hash_password(PASSWORD).unwrap(),
            role,
        })
        .await
        .unwrap()
}

/// Serve the app on an ephemeral port and return its API base URL.
async fn spawn_server() -> (String, Storage) {
    let config = test_config();
    let storage = Storage::in_memory();
    seed_user(&storage, "admin", Role::Admin).await;
    seed_user(&storage, "viewer", Role::Viewer).await;

    let state = AppState {
        storage: storage.clone(),
        pool: None,
        config: Arc::new(config.clone()),
    };
    let app = build_app_router(state, &config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api/v1"), storage)
}

#[tokio::test]
async fn gated_fetch_waits_for_login() {
    let (base_url, _storage) = spawn_server().await;
    let client = Arc::new(ApiClient::new(base_url));
    assert_eq!(client.gate().state(), AuthState::Pending);

    let fetch = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.list_clients(false).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!fetch.is_finished(), "fetch must wait while the gate is pending");

    client.login("admin", PASSWORD).await.unwrap();
    let clients = fetch.await.unwrap().unwrap();
    assert!(clients.is_empty());
}

#[tokio::test]
async fn signed_out_client_rejects_gated_calls() {
    let (base_url, _storage) = spawn_server().await;
    let client = ApiClient::new(base_url);

    assert!(client.resume(None).await.unwrap().is_none());
    assert_matches!(client.list_clients(false).await, Err(ClientError::SignedOut));
}

#[tokio::test]
async fn login_invalidates_cached_responses() {
    let (base_url, storage) = spawn_server().await;
    let client = ApiClient::new(base_url);

    let admin = client.login("admin", PASSWORD).await.unwrap();
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(client.me().await.unwrap().username, "admin");

    let created = client
        .create_client(&NewClient {
            name: "Acme".into(),
            code: "ACME".into(),
        })
        .await
        .unwrap();
    assert_eq!(created.status, ClientDisplayStatus::Active);

    storage
        .create_entity(
            created.id,
            &CreateEntity {
                name: "Head office".into(),
                code: "HO".into(),
                is_active: None,
            },
        )
        .await
        .unwrap();

    let entities = client.selectable_entities(created.id, None).await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].code, "HO");

    // Switching users must not serve the admin's cached identity.
    client.logout().await.unwrap();
    client.login("viewer", PASSWORD).await.unwrap();
    assert_eq!(client.gate().generation(), 3);
    assert_eq!(client.me().await.unwrap().username, "viewer");
}

#[tokio::test]
async fn bad_credentials_surface_api_error() {
    let (base_url, _storage) = spawn_server().await;
    let client = ApiClient::new(base_url);

    let err = client.login("admin", "wrong-password").await.unwrap_err();
    assert_matches!(err, ClientError::Api { status: 401, ref code, .. } if code == "UNAUTHORIZED");
    assert_eq!(client.gate().state(), AuthState::Pending);
}

#[tokio::test]
async fn viewer_cannot_create_clients() {
    let (base_url, _storage) = spawn_server().await;
    let client = ApiClient::new(base_url);
    client.login("viewer", PASSWORD).await.unwrap();

    let err = client
        .create_client(&NewClient {
            name: "Nope".into(),
            code: "NOPE".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn resume_adopts_existing_token_without_new_generation() {
    let (base_url, _storage) = spawn_server().await;
    let first = ApiClient::new(base_url.clone());
    first.login("admin", PASSWORD).await.unwrap();
    let token = first.access_token().await.unwrap();

    let second = ApiClient::new(base_url.clone());
    let user = second.resume(Some(token)).await.unwrap().unwrap();
    assert_eq!(user.username, "admin");
    assert_eq!(second.gate().generation(), 0);
    assert_eq!(second.list_clients(false).await.unwrap().len(), 0);

    let rejected = ApiClient::new(base_url);
    assert!(rejected.resume(Some("garbage".into())).await.unwrap().is_none());
    assert_eq!(rejected.gate().state(), AuthState::SignedOut);
}

#[tokio::test]
async fn resuming_another_users_token_drops_cached_responses() {
    let (base_url, _storage) = spawn_server().await;
    let viewer = ApiClient::new(base_url.clone());
    viewer.login("viewer", PASSWORD).await.unwrap();
    let viewer_token = viewer.access_token().await.unwrap();

    let client = ApiClient::new(base_url);
    client.login("admin", PASSWORD).await.unwrap();
    assert_eq!(client.me().await.unwrap().username, "admin");

    client.resume(Some(viewer_token)).await.unwrap().unwrap();
    assert_eq!(client.gate().generation(), 2);
    assert_eq!(client.me().await.unwrap().username, "viewer");
}

#[tokio::test]
async fn staged_upload_is_promoted_onto_saved_entry() {
    let (base_url, storage) = spawn_server().await;
    let client = ApiClient::new(base_url);
    let admin = client.login("admin", PASSWORD).await.unwrap();

    let acme = client
        .create_client(&NewClient {
            name: "Acme".into(),
            code: "ACME".into(),
        })
        .await
        .unwrap();
    let entity = storage
        .create_entity(
            acme.id,
            &CreateEntity {
                name: "Head office".into(),
                code: "HO".into(),
                is_active: None,
            },
        )
        .await
        .unwrap();

    let key = new_staging_key();
    let staged = client
        .upload_staged_file(acme.id, key, "receipt.txt", "text/plain", b"paid".to_vec())
        .await
        .unwrap();
    assert_eq!(staged.staging_key, Some(key));
    assert_eq!(staged.journal_entry_id, None);
    assert_eq!(client.staged_files(acme.id, key).await.unwrap().len(), 1);

    let input: CreateJournalEntry = serde_json::from_value(serde_json::json!({
        "entry_date": "2026-03-01",
        "description": "Office supplies",
    }))
    .unwrap();
    let entry = storage
        .create_journal_entry(acme.id, entity.id, admin.user_id, &input)
        .await
        .unwrap();

    let attached = client
        .promote_staged(acme.id, entity.id, entry.entry.id, key)
        .await
        .unwrap();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].journal_entry_id, Some(entry.entry.id));
    assert_eq!(attached[0].size_bytes, 4);
    assert!(client.staged_files(acme.id, key).await.unwrap().is_empty());

    let entries = client.list_journal_entries(acme.id, entity.id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].description, "Office supplies");
}
