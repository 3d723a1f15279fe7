use async_trait::async_trait;
use chrono::Utc;
use tally_core::selection::is_selectable;
use tally_core::types::DbId;

use super::{MemoryStore, Tables};
use crate::error::{StoreError, StoreResult};
use crate::models::entity::{CreateEntity, Entity, UpdateEntity};
use crate::stores::EntityStore;

fn ensure_code_free(
    t: &Tables,
    client_id: DbId,
    code: &str,
    exclude_id: Option<DbId>,
) -> StoreResult<()> {
    let taken = t
        .entities
        .values()
        .any(|e| e.client_id == client_id && e.code == code && Some(e.id) != exclude_id);
    if taken {
        return Err(StoreError::conflict(format!(
            "Entity code '{code}' already exists for this client"
        )));
    }
    Ok(())
}

fn sorted(mut entities: Vec<Entity>) -> Vec<Entity> {
    entities.sort_by(|a, b| a.code.cmp(&b.code).then(a.id.cmp(&b.id)));
    entities
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_entity(&self, client_id: DbId, input: &CreateEntity) -> StoreResult<Entity> {
        let mut t = self.tables.write().await;
        if !t.clients.contains_key(&client_id) {
            return Err(StoreError::not_found("Client", client_id));
        }
        ensure_code_free(&t, client_id, &input.code, None)?;
        let now = Utc::now();
        let entity = Entity {
            id: t.next_id(),
            client_id,
            name: input.name.clone(),
            code: input.code.clone(),
            is_active: input.is_active.unwrap_or(true),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        t.entities.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_entity(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Entity>> {
        let t = self.tables.read().await;
        Ok(t.entities
            .get(&id)
            .filter(|e| e.client_id == client_id && !e.is_deleted())
            .cloned())
    }

    async fn list_entities(
        &self,
        client_id: DbId,
        include_inactive: bool,
    ) -> StoreResult<Vec<Entity>> {
        let t = self.tables.read().await;
        Ok(sorted(
            t.entities
                .values()
                .filter(|e| e.client_id == client_id && !e.is_deleted())
                .filter(|e| include_inactive || e.is_active)
                .cloned()
                .collect(),
        ))
    }

    async fn list_selectable_entities(
        &self,
        client_id: DbId,
        selected_id: Option<DbId>,
    ) -> StoreResult<Vec<Entity>> {
        let t = self.tables.read().await;
        Ok(sorted(
            t.entities
                .values()
                .filter(|e| e.client_id == client_id)
                .filter(|e| is_selectable(e.id, e.is_active, e.is_deleted(), selected_id))
                .cloned()
                .collect(),
        ))
    }

    async fn update_entity(
        &self,
        client_id: DbId,
        id: DbId,
        input: &UpdateEntity,
    ) -> StoreResult<Option<Entity>> {
        let mut t = self.tables.write().await;
        if let Some(code) = &input.code {
            ensure_code_free(&t, client_id, code, Some(id))?;
        }
        let Some(entity) = t
            .entities
            .get_mut(&id)
            .filter(|e| e.client_id == client_id && !e.is_deleted())
        else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            entity.name = name.clone();
        }
        if let Some(code) = &input.code {
            entity.code = code.clone();
        }
        if let Some(is_active) = input.is_active {
            entity.is_active = is_active;
        }
        entity.updated_at = Utc::now();
        Ok(Some(entity.clone()))
    }

    async fn soft_delete_entity(&self, client_id: DbId, id: DbId) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t
            .entities
            .get_mut(&id)
            .filter(|e| e.client_id == client_id && !e.is_deleted())
        {
            Some(entity) => {
                entity.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
