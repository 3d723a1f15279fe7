//! HTTP tests for clients, entities and the chart of accounts.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, delete_auth, get_auth, post_empty_auth, post_json_auth, put_json_auth};
use serde_json::{json, Value};

async fn create(app: axum::Router, uri: &str, body: Value, token: &str) -> Value {
    let response = post_json_auth(app, uri, body, token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

#[tokio::test]
async fn client_status_follows_deletion_then_activity() {
    let t = build_test_app().await;
    let admin = t.admin_token();
    let client = create(
        t.app(),
        "/api/v1/clients",
        json!({ "name": "Globex", "code": "GLX" }),
        &admin,
    )
    .await;
    let id = client["id"].as_i64().unwrap();
    assert_eq!(client["status"], "active");
    let uri = format!("/api/v1/clients/{id}");

    let response = put_json_auth(t.app(), &uri, json!({ "is_active": false }), &admin).await;
    assert_eq!(body_json(response).await["data"]["status"], "inactive");

    let response = delete_auth(t.app(), &uri, &admin).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Deleted wins regardless of the activity flag.
    let json = body_json(get_auth(t.app(), &uri, &admin).await).await;
    assert_eq!(json["data"]["status"], "deleted");
    assert_eq!(json["data"]["is_deleted"], true);

    // Hidden from the default list, shown on request.
    let json = body_json(get_auth(t.app(), "/api/v1/clients", &admin).await).await;
    assert_eq!(json["data"], json!([]));
    let json = body_json(get_auth(t.app(), "/api/v1/clients?include_deleted=true", &admin).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    // Nested resources of a deleted client are gone.
    let response = get_auth(t.app(), &format!("{uri}/entities"), &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_empty_auth(t.app(), &format!("{uri}/restore"), &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "inactive");
}

#[tokio::test]
async fn client_writes_need_admin_and_unique_codes() {
    let t = build_test_app().await;
    let body = json!({ "name": "Initech", "code": "INI" });

    let response = post_json_auth(t.app(), "/api/v1/clients", body.clone(), &t.accountant_token()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    create(t.app(), "/api/v1/clients", body.clone(), &t.admin_token()).await;
    let response = post_json_auth(t.app(), "/api/v1/clients", body, &t.admin_token()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = post_json_auth(
        t.app(),
        "/api/v1/clients",
        json!({ "name": "", "code": "X" }),
        &t.admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["errors"][0]["field"], "name");
}

#[tokio::test]
async fn selectable_entities_keep_current_choice() {
    let t = build_test_app().await;
    let admin = t.admin_token();
    let client = create(t.app(), "/api/v1/clients", json!({ "name": "Acme", "code": "ACME" }), &admin).await;
    let base = format!("/api/v1/clients/{}/entities", client["id"]);

    let north = create(t.app(), &base, json!({ "name": "North", "code": "N" }), &admin).await;
    let south = create(t.app(), &base, json!({ "name": "South", "code": "S" }), &admin).await;
    let north_id = north["id"].as_i64().unwrap();
    let south_id = south["id"].as_i64().unwrap();

    put_json_auth(t.app(), &format!("{base}/{north_id}"), json!({ "is_active": false }), &admin).await;

    let codes = |json: Value| -> Vec<String> {
        json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["code"].as_str().unwrap().to_string())
            .collect()
    };

    let json = body_json(get_auth(t.app(), &format!("{base}/selectable"), &admin).await).await;
    assert_eq!(codes(json), ["S"]);

    let json = body_json(
        get_auth(t.app(), &format!("{base}/selectable?selected_id={north_id}"), &admin).await,
    )
    .await;
    assert_eq!(codes(json), ["N", "S"]);

    // A deleted selection is never offered.
    delete_auth(t.app(), &format!("{base}/{south_id}"), &admin).await;
    let json = body_json(
        get_auth(t.app(), &format!("{base}/selectable?selected_id={south_id}"), &admin).await,
    )
    .await;
    assert_eq!(codes(json), Vec::<String>::new());
}

#[tokio::test]
async fn account_tree_and_cycle_rejection() {
    let t = build_test_app().await;
    let admin = t.admin_token();
    let client = create(t.app(), "/api/v1/clients", json!({ "name": "Acme", "code": "ACME" }), &admin).await;
    let base = format!("/api/v1/clients/{}/accounts", client["id"]);

    let assets = create(
        t.app(),
        &base,
        json!({ "code": "1000", "name": "Assets", "account_type": "asset" }),
        &admin,
    )
    .await;
    let assets_id = assets["id"].as_i64().unwrap();
    let bank = create(
        t.app(),
        &base,
        json!({ "code": "1200", "name": "Bank", "account_type": "asset", "parent_id": assets_id }),
        &admin,
    )
    .await;
    create(
        t.app(),
        &base,
        json!({ "code": "1100", "name": "Cash", "account_type": "asset", "parent_id": assets_id }),
        &admin,
    )
    .await;

    let json = body_json(get_auth(t.app(), &format!("{base}/tree"), &t.viewer_token()).await).await;
    let roots = json["data"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["code"], "1000");
    assert_eq!(roots[0]["children"][0]["code"], "1100");
    assert_eq!(roots[0]["children"][1]["code"], "1200");

    // Making the root a child of its own descendant is refused.
    let response = put_json_auth(
        t.app(),
        &format!("{base}/{assets_id}"),
        json!({ "parent_id": bank["id"] }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = delete_auth(t.app(), &format!("{base}/{}", bank["id"]), &admin).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let json = body_json(get_auth(t.app(), &base, &admin).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let response = post_json_auth(
        t.app(),
        &base,
        json!({ "code": "9000", "name": "Other", "account_type": "asset" }),
        &t.viewer_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
