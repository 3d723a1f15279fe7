//! Clients, entities and the chart of accounts.

use assert_matches::assert_matches;
use tally_core::chart::{build_tree, AccountType};
use tally_core::client_status::ClientDisplayStatus;
use tally_core::error::CoreError;
use tally_core::types::DbId;
use tally_db::models::account::{CreateAccount, UpdateAccount};
use tally_db::models::client::{ClientResponse, CreateClient, UpdateClient};
use tally_db::models::entity::{CreateEntity, UpdateEntity};
use tally_db::{Storage, StoreError};

async fn client(storage: &Storage, code: &str) -> DbId {
    storage
        .create_client(&CreateClient {
            name: format!("Client {code}"),
            code: code.into(),
            is_active: None,
        })
        .await
        .unwrap()
        .id
}

fn new_account(code: &str, parent_id: Option<DbId>) -> CreateAccount {
    CreateAccount {
        code: code.into(),
        name: format!("Account {code}"),
        account_type: AccountType::Asset,
        parent_id,
    }
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

#[tokio::test]
async fn soft_deleted_client_reports_deleted_even_when_active() {
    let storage = Storage::in_memory();
    let id = client(&storage, "ACME").await;

    assert!(storage.soft_delete_client(id).await.unwrap());
    assert!(!storage.soft_delete_client(id).await.unwrap(), "idempotent");

    let found = storage.find_client(id).await.unwrap().unwrap();
    assert!(found.is_active);
    let response = ClientResponse::from(found);
    assert_eq!(response.status, ClientDisplayStatus::Deleted);

    assert!(storage.list_clients(false).await.unwrap().is_empty());
    assert_eq!(storage.list_clients(true).await.unwrap().len(), 1);
}

#[tokio::test]
async fn restore_brings_back_previous_activation() {
    let storage = Storage::in_memory();
    let id = client(&storage, "ACME").await;
    storage
        .update_client(
            id,
            &UpdateClient {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    storage.soft_delete_client(id).await.unwrap();

    assert!(storage
        .update_client(
            id,
            &UpdateClient {
                name: Some("ignored".into()),
                ..Default::default()
            }
        )
        .await
        .unwrap()
        .is_none());

    assert!(storage.restore_client(id).await.unwrap());
    let restored = storage.find_client(id).await.unwrap().unwrap();
    assert_eq!(restored.display_status(), ClientDisplayStatus::Inactive);
}

#[tokio::test]
async fn client_codes_are_unique() {
    let storage = Storage::in_memory();
    client(&storage, "ACME").await;
    let err = storage
        .create_client(&CreateClient {
            name: "Other".into(),
            code: "ACME".into(),
            is_active: None,
        })
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Conflict(_)));
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[tokio::test]
async fn selection_keeps_deactivated_choice_but_never_deleted() {
    let storage = Storage::in_memory();
    let client_id = client(&storage, "ACME").await;
    let mut ids = Vec::new();
    for code in ["A", "B", "C"] {
        let entity = storage
            .create_entity(
                client_id,
                &CreateEntity {
                    name: code.into(),
                    code: code.into(),
                    is_active: None,
                },
            )
            .await
            .unwrap();
        ids.push(entity.id);
    }
    let deactivate = UpdateEntity {
        is_active: Some(false),
        ..Default::default()
    };
    storage
        .update_entity(client_id, ids[1], &deactivate)
        .await
        .unwrap();
    storage
        .update_entity(client_id, ids[2], &deactivate)
        .await
        .unwrap();
    storage.soft_delete_entity(client_id, ids[2]).await.unwrap();

    let codes = |entities: Vec<tally_db::models::entity::Entity>| {
        entities.into_iter().map(|e| e.code).collect::<Vec<_>>()
    };

    let plain = storage
        .list_selectable_entities(client_id, None)
        .await
        .unwrap();
    assert_eq!(codes(plain), vec!["A"]);

    let keeping_b = storage
        .list_selectable_entities(client_id, Some(ids[1]))
        .await
        .unwrap();
    assert_eq!(codes(keeping_b), vec!["A", "B"]);

    let deleted_choice = storage
        .list_selectable_entities(client_id, Some(ids[2]))
        .await
        .unwrap();
    assert_eq!(codes(deleted_choice), vec!["A"]);
}

// ---------------------------------------------------------------------------
// Chart of accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chart_tree_nests_children_by_code() {
    let storage = Storage::in_memory();
    let client_id = client(&storage, "ACME").await;
    let assets = storage
        .create_account(client_id, &new_account("1000", None))
        .await
        .unwrap();
    storage
        .create_account(client_id, &new_account("1200", Some(assets.id)))
        .await
        .unwrap();
    storage
        .create_account(client_id, &new_account("1100", Some(assets.id)))
        .await
        .unwrap();

    let tree = build_tree(storage.list_accounts(client_id, false).await.unwrap());
    assert_eq!(tree.len(), 1);
    let child_codes: Vec<&str> = tree[0]
        .children
        .iter()
        .map(|n| n.account.code.as_str())
        .collect();
    assert_eq!(child_codes, vec!["1100", "1200"]);
}

#[tokio::test]
async fn reparenting_under_a_descendant_is_rejected() {
    let storage = Storage::in_memory();
    let client_id = client(&storage, "ACME").await;
    let root = storage
        .create_account(client_id, &new_account("1000", None))
        .await
        .unwrap();
    let child = storage
        .create_account(client_id, &new_account("1100", Some(root.id)))
        .await
        .unwrap();

    let err = storage
        .update_account(
            client_id,
            root.id,
            &UpdateAccount {
                parent_id: Some(Some(child.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Validation(msg)) => {
        assert!(msg.contains("cycle"));
    });

    let detached = storage
        .update_account(
            client_id,
            child.id,
            &UpdateAccount {
                parent_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detached.parent_id, None);
}

#[tokio::test]
async fn parent_must_belong_to_same_client() {
    let storage = Storage::in_memory();
    let first = client(&storage, "ONE").await;
    let second = client(&storage, "TWO").await;
    let foreign = storage
        .create_account(first, &new_account("1000", None))
        .await
        .unwrap();

    let err = storage
        .create_account(second, &new_account("1000", Some(foreign.id)))
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Core(CoreError::Validation(_)));
}
