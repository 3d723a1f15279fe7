//! Tests for `AppError` to HTTP response mapping.
//!
//! Most call `IntoResponse` directly on `AppError` values; the extractor
//! tests at the end go through the router.

mod common;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use tally_api::error::AppError;
use tally_core::error::CoreError;
use tally_db::StoreError;
use validator::Validate;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "JournalEntry",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "JournalEntry with id 42 not found");
    assert!(json.get("errors").is_none());
}

#[tokio::test]
async fn validation_returns_400_with_message() {
    let err = AppError::Core(CoreError::Validation("Journal entry is posted".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Journal entry is posted");
}

#[derive(Validate)]
struct Payload {
    #[validate(length(min = 1))]
    code: String,
}

#[tokio::test]
async fn field_errors_are_listed() {
    let err: AppError = Payload {
        code: String::new(),
    }
    .validate()
    .unwrap_err()
    .into();

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["errors"][0]["field"], "code");
    assert_eq!(json["errors"][0]["code"], "length");
}

#[tokio::test]
async fn conflict_returns_409() {
    let err = AppError::Core(CoreError::Conflict("duplicate reference".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn unauthorized_and_forbidden() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Unauthorized("no token".into()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");

    let (status, json) =
        error_to_response(AppError::Core(CoreError::Forbidden("admins only".into()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
}

#[tokio::test]
async fn internal_error_is_sanitized() {
    let err = AppError::InternalError("secret database credentials leaked".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn store_errors_map_through() {
    let err: AppError = StoreError::conflict("Client code 'ACME' already exists").into();
    let (status, _) = error_to_response(err).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/var/attachments");
    let err: AppError = StoreError::Io(io).into();
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn row_not_found_returns_404() {
    let (status, json) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn undecodable_json_body_is_a_400_error_body() {
    let t = common::build_test_app().await;
    let response = common::post_json(
        t.app(),
        "/api/v1/auth/login",
        serde_json::json!({ "username": 5 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = common::body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["error"].as_str().unwrap().contains("username"), "{json}");
}

#[tokio::test]
async fn undecodable_query_is_a_400_error_body() {
    let t = common::build_test_app().await;
    let response = common::get_auth(
        t.app(),
        "/api/v1/clients?include_deleted=maybe",
        &t.admin_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::body_json(response).await["code"], "BAD_REQUEST");
}
