//! Repository for the `entities` table.

use async_trait::async_trait;
use sqlx::PgPool;
use tally_core::types::DbId;

use crate::error::StoreResult;
use crate::models::entity::{CreateEntity, Entity, UpdateEntity};
use crate::stores::EntityStore;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, client_id, name, code, is_active, deleted_at, created_at, updated_at";

pub struct EntityRepo {
    pool: PgPool,
}

impl EntityRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for EntityRepo {
    async fn create_entity(&self, client_id: DbId, input: &CreateEntity) -> StoreResult<Entity> {
        let query = format!(
            "INSERT INTO entities (client_id, name, code, is_active)
             VALUES ($1, $2, $3, COALESCE($4, true))
             RETURNING {COLUMNS}"
        );
        let entity = sqlx::query_as::<_, Entity>(&query)
            .bind(client_id)
            .bind(&input.name)
            .bind(&input.code)
            .bind(input.is_active)
            .fetch_one(&self.pool)
            .await?;
        Ok(entity)
    }

    async fn find_entity(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Entity>> {
        let query = format!(
            "SELECT {COLUMNS} FROM entities
             WHERE id = $1 AND client_id = $2 AND deleted_at IS NULL"
        );
        let entity = sqlx::query_as::<_, Entity>(&query)
            .bind(id)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entity)
    }

    async fn list_entities(
        &self,
        client_id: DbId,
        include_inactive: bool,
    ) -> StoreResult<Vec<Entity>> {
        let query = format!(
            "SELECT {COLUMNS} FROM entities
             WHERE client_id = $1 AND deleted_at IS NULL AND ($2 OR is_active)
             ORDER BY code, id"
        );
        let entities = sqlx::query_as::<_, Entity>(&query)
            .bind(client_id)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;
        Ok(entities)
    }

    /// Mirrors [`tally_core::selection::is_selectable`] in SQL.
    async fn list_selectable_entities(
        &self,
        client_id: DbId,
        selected_id: Option<DbId>,
    ) -> StoreResult<Vec<Entity>> {
        let query = format!(
            "SELECT {COLUMNS} FROM entities
             WHERE client_id = $1
               AND deleted_at IS NULL
               AND (is_active OR id = $2)
             ORDER BY code, id"
        );
        let entities = sqlx::query_as::<_, Entity>(&query)
            .bind(client_id)
            .bind(selected_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(entities)
    }

    async fn update_entity(
        &self,
        client_id: DbId,
        id: DbId,
        input: &UpdateEntity,
    ) -> StoreResult<Option<Entity>> {
        let query = format!(
            "UPDATE entities SET
                name = COALESCE($3, name),
                code = COALESCE($4, code),
                is_active = COALESCE($5, is_active)
             WHERE id = $1 AND client_id = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        let entity = sqlx::query_as::<_, Entity>(&query)
            .bind(id)
            .bind(client_id)
            .bind(&input.name)
            .bind(&input.code)
            .bind(input.is_active)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entity)
    }

    async fn soft_delete_entity(&self, client_id: DbId, id: DbId) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE entities SET deleted_at = NOW()
             WHERE id = $1 AND client_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(client_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
