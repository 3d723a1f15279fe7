use async_trait::async_trait;
use chrono::Utc;
use tally_core::types::DbId;

use super::MemoryStore;
use crate::error::{StoreError, StoreResult};
use crate::models::user::{CreateUser, User};
use crate::stores::UserStore;

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, input: &CreateUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == input.username) {
            return Err(StoreError::conflict(format!(
                "Username '{}' is already taken",
                input.username
            )));
        }
        let now = Utc::now();
        let user = User {
            id: t.next_id(),
            username: input.username.clone(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            role: input.role,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: DbId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let t = self.tables.read().await;
        let mut users: Vec<User> = t.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn record_login(&self, id: DbId) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if let Some(user) = t.users.get_mut(&id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }
}
