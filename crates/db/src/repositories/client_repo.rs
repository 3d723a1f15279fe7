//! Repository for the `clients` table.

use async_trait::async_trait;
use sqlx::PgPool;
use tally_core::types::DbId;

use crate::error::StoreResult;
use crate::models::client::{Client, CreateClient, UpdateClient};
use crate::stores::ClientStore;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, code, is_active, deleted_at, created_at, updated_at";

pub struct ClientRepo {
    pool: PgPool,
}

impl ClientRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientStore for ClientRepo {
    async fn create_client(&self, input: &CreateClient) -> StoreResult<Client> {
        let query = format!(
            "INSERT INTO clients (name, code, is_active)
             VALUES ($1, $2, COALESCE($3, true))
             RETURNING {COLUMNS}"
        );
        let client = sqlx::query_as::<_, Client>(&query)
            .bind(&input.name)
            .bind(&input.code)
            .bind(input.is_active)
            .fetch_one(&self.pool)
            .await?;
        Ok(client)
    }

    async fn find_client(&self, id: DbId) -> StoreResult<Option<Client>> {
        let query = format!("SELECT {COLUMNS} FROM clients WHERE id = $1");
        let client = sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    async fn list_clients(&self, include_deleted: bool) -> StoreResult<Vec<Client>> {
        let query = format!(
            "SELECT {COLUMNS} FROM clients
             WHERE $1 OR deleted_at IS NULL
             ORDER BY name, id"
        );
        let clients = sqlx::query_as::<_, Client>(&query)
            .bind(include_deleted)
            .fetch_all(&self.pool)
            .await?;
        Ok(clients)
    }

    async fn update_client(&self, id: DbId, input: &UpdateClient) -> StoreResult<Option<Client>> {
        let query = format!(
            "UPDATE clients SET
                name = COALESCE($2, name),
                code = COALESCE($3, code),
                is_active = COALESCE($4, is_active)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        let client = sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.code)
            .bind(input.is_active)
            .fetch_optional(&self.pool)
            .await?;
        Ok(client)
    }

    async fn soft_delete_client(&self, id: DbId) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE clients SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn restore_client(&self, id: DbId) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE clients SET deleted_at = NULL WHERE id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
