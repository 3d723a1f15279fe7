//! HTTP-level tests for login, refresh, logout, the session cookie and
//! admin user management.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, get, get_auth, get_with_cookie, post_empty_auth, post_json,
    post_json_auth, TEST_PASSWORD,
};
use serde_json::json;

async fn login(app: axum::Router, username: &str) -> axum::http::Response<axum::body::Body> {
    post_json(
        app,
        "/api/v1/auth/login",
        json!({ "username": username, "password": TEST_PASSWORD }),
    )
    .await
}

#[tokio::test]
async fn health_is_public() {
    let t = build_test_app().await;
    let response = get(t.app(), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["db_healthy"].is_null());
    assert_eq!(json["storage"], "memory");
}

#[tokio::test]
async fn responses_carry_request_id_and_cors_headers() {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    let t = build_test_app().await;
    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = t.app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );
    assert_eq!(response.headers()["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn login_returns_tokens_and_sets_cookie() {
    let t = build_test_app().await;
    let response = login(t.app(), "accountant").await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("tally_session="));
    assert!(cookie.contains("HttpOnly"));

    let json = body_json(response).await;
    assert!(json["data"]["access_token"].is_string());
    assert!(json["data"]["refresh_token"].is_string());
    assert_eq!(json["data"]["expires_in"], 900);
    assert_eq!(json["data"]["user"]["username"], "accountant");
    assert_eq!(json["data"]["user"]["role"], "accountant");
    assert!(json["data"]["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_401() {
    let t = build_test_app().await;

    let response = post_json(
        t.app(),
        "/api/v1/auth/login",
        json!({ "username": "admin", "password": "not-the-password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = login(t.app(), "nobody").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid username or password");
}

#[tokio::test]
async fn session_cookie_authenticates() {
    let t = build_test_app().await;
    let response = login(t.app(), "viewer").await;
    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    let cookie = set_cookie.split(';').next().unwrap();

    let response = get_with_cookie(t.app(), "/api/v1/auth/me", cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["username"], "viewer");
    assert_eq!(json["data"]["role"], "viewer");
}

#[tokio::test]
async fn missing_or_bad_token_is_401() {
    let t = build_test_app().await;

    let response = get(t.app(), "/api/v1/clients").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(t.app(), "/api/v1/clients", "not.a.jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn refresh_rotates_token() {
    let t = build_test_app().await;
    let json = body_json(login(t.app(), "admin").await).await;
    let refresh_token = json["data"]["refresh_token"].as_str().unwrap().to_string();

    let response = post_json(
        t.app(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["data"]["refresh_token"], refresh_token.as_str());

    // The old token was revoked by the rotation.
    let response = post_json(
        t.app(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_sessions_and_clears_cookie() {
    let t = build_test_app().await;
    let json = body_json(login(t.app(), "accountant").await).await;
    let access_token = json["data"]["access_token"].as_str().unwrap().to_string();
    let refresh_token = json["data"]["refresh_token"].as_str().unwrap().to_string();

    let response = post_empty_auth(t.app(), "/api/v1/auth/logout", &access_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(cookie.contains("Max-Age=0"));

    let response = post_json(
        t.app(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_manages_users() {
    let t = build_test_app().await;
    let body = json!({
        "username": "newbie",
        "email": "newbie@test.com",
        "password": "long-enough-password",
        "role": "accountant",
    });

    let response = post_json_auth(t.app(), "/api/v1/admin/users", body.clone(), &t.admin_token()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["role"], "accountant");

    let response = post_json_auth(t.app(), "/api/v1/admin/users", body, &t.admin_token()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = get_auth(t.app(), "/api/v1/admin/users", &t.admin_token()).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn non_admins_cannot_manage_users() {
    let t = build_test_app().await;
    let response = get_auth(t.app(), "/api/v1/admin/users", &t.accountant_token()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn weak_password_rejected() {
    let t = build_test_app().await;
    let response = post_json_auth(
        t.app(),
        "/api/v1/admin/users",
        json!({
            "username": "weak",
            "email": "weak@test.com",
            "password": "short",
            "role": "viewer",
        }),
        &t.admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("at least 12"));
}
