#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use tally_api::auth::jwt::{encode_access_token, JwtConfig};
use tally_api::auth::password::hash_password;
use tally_api::config::{ServerConfig, StorageBackend};
use tally_api::router::build_app_router;
use tally_api::state::AppState;
use tally_core::roles::Role;
use tally_db::models::user::{CreateUser, User};
use tally_db::Storage;

/// Password shared by every seeded test user.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Build a test `ServerConfig` with safe defaults and the in-memory backend.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
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

/// A running app over a fresh in-memory store with one user per role.
pub struct TestApp {
    pub router: Router,
    pub storage: Storage,
    pub config: ServerConfig,
    pub admin: User,
    pub accountant: User,
    pub viewer: User,
}

impl TestApp {
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    pub fn token_for(&self, user: &User) -> String {
        encode_access_token(user.id, user.role, &self.config.jwt).unwrap()
    }

    pub fn admin_token(&self) -> String {
        self.token_for(&self.admin)
    }

    pub fn accountant_token(&self) -> String {
        self.token_for(&self.accountant)
    }

    pub fn viewer_token(&self) -> String {
        self.token_for(&self.viewer)
    }
}

pub async fn create_user(storage: &Storage, username: &str, role: Role) -> User {
    storage
        .create_user(&CreateUser {
            username: username.to_string(),
            email: format!("{username}@test.com"),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            role,
        })
        .await
        .unwrap()
}

/// Build the full application router with all middleware layers, the same
/// way `main.rs` does.
pub async fn build_test_app() -> TestApp {
    let config = test_config();
    let storage = Storage::in_memory();

    let admin = create_user(&storage, "admin", Role::Admin).await;
    let accountant = create_user(&storage, "accountant", Role::Accountant).await;
    let viewer = create_user(&storage, "viewer", Role::Viewer).await;

    let state = AppState {
        storage: storage.clone(),
        pool: None,
        config: Arc::new(config.clone()),
    };
    let router = build_app_router(state, &config);

    TestApp {
        router,
        storage,
        config,
        admin,
        accountant,
        viewer,
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.unwrap()
}

fn request(method: Method, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);
    match token {
        Some(token) => builder.header("authorization", format!("Bearer {token}")),
        None => builder,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, request(Method::GET, uri, None).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(
        app,
        request(Method::GET, uri, Some(token))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn get_with_cookie(app: Router, uri: &str, cookie: &str) -> Response<Body> {
    let req = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("cookie", cookie)
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(
        app,
        request(Method::POST, uri, None)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(
        app,
        request(Method::POST, uri, Some(token))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn post_empty_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(
        app,
        request(Method::POST, uri, Some(token))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(
        app,
        request(Method::PUT, uri, Some(token))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(
        app,
        request(Method::DELETE, uri, Some(token))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

const BOUNDARY: &str = "tally-test-boundary";

/// POST a multipart form with a single `file` field.
pub async fn upload_auth(
    app: Router,
    uri: &str,
    file_name: &str,
    content_type: &str,
    content: &[u8],
    token: &str,
) -> Response<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    send(
        app,
        request(Method::POST, uri, Some(token))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap(),
    )
    .await
}
