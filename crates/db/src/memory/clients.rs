use async_trait::async_trait;
use chrono::Utc;
use tally_core::types::DbId;

use super::MemoryStore;
use crate::error::{StoreError, StoreResult};
use crate::models::client::{Client, CreateClient, UpdateClient};
use crate::stores::ClientStore;

fn code_taken(code: &str) -> StoreError {
    StoreError::conflict(format!("Client code '{code}' already exists"))
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn create_client(&self, input: &CreateClient) -> StoreResult<Client> {
        let mut t = self.tables.write().await;
        if t.clients.values().any(|c| c.code == input.code) {
            return Err(code_taken(&input.code));
        }
        let now = Utc::now();
        let client = Client {
            id: t.next_id(),
            name: input.name.clone(),
            code: input.code.clone(),
            is_active: input.is_active.unwrap_or(true),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        t.clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn find_client(&self, id: DbId) -> StoreResult<Option<Client>> {
        Ok(self.tables.read().await.clients.get(&id).cloned())
    }

    async fn list_clients(&self, include_deleted: bool) -> StoreResult<Vec<Client>> {
        let t = self.tables.read().await;
        let mut clients: Vec<Client> = t
            .clients
            .values()
            .filter(|c| include_deleted || !c.is_deleted())
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(clients)
    }

    async fn update_client(&self, id: DbId, input: &UpdateClient) -> StoreResult<Option<Client>> {
        let mut t = self.tables.write().await;
        if let Some(code) = &input.code {
            if t.clients.values().any(|c| c.id != id && &c.code == code) {
                return Err(code_taken(code));
            }
        }
        let Some(client) = t.clients.get_mut(&id).filter(|c| !c.is_deleted()) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            client.name = name.clone();
        }
        if let Some(code) = &input.code {
            client.code = code.clone();
        }
        if let Some(is_active) = input.is_active {
            client.is_active = is_active;
        }
        client.updated_at = Utc::now();
        Ok(Some(client.clone()))
    }

    async fn soft_delete_client(&self, id: DbId) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.clients.get_mut(&id).filter(|c| !c.is_deleted()) {
            Some(client) => {
                client.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn restore_client(&self, id: DbId) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.clients.get_mut(&id).filter(|c| c.is_deleted()) {
            Some(client) => {
                client.deleted_at = None;
                client.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
