use async_trait::async_trait;
use chrono::Utc;
use tally_core::types::DbId;

use super::MemoryStore;
use crate::error::StoreResult;
use crate::models::session::{CreateSession, UserSession};
use crate::stores::SessionStore;

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, input: &CreateSession) -> StoreResult<UserSession> {
        let mut t = self.tables.write().await;
        let session = UserSession {
            id: t.next_id(),
            user_id: input.user_id,
            refresh_token_hash: input.refresh_token_hash.clone(),
            expires_at: input.expires_at,
            is_revoked: false,
            created_at: Utc::now(),
        };
        t.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_active_session(
        &self,
        refresh_token_hash: &str,
    ) -> StoreResult<Option<UserSession>> {
        let now = Utc::now();
        let t = self.tables.read().await;
        Ok(t.sessions
            .values()
            .find(|s| {
                s.refresh_token_hash == refresh_token_hash && !s.is_revoked && s.expires_at > now
            })
            .cloned())
    }

    async fn revoke_session(&self, id: DbId) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.sessions.get_mut(&id).filter(|s| !s.is_revoked) {
            Some(session) => {
                session.is_revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_user_sessions(&self, user_id: DbId) -> StoreResult<u64> {
        let mut t = self.tables.write().await;
        let mut revoked = 0;
        for session in t
            .sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && !s.is_revoked)
        {
            session.is_revoked = true;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn purge_expired_sessions(&self) -> StoreResult<u64> {
        let now = Utc::now();
        let mut t = self.tables.write().await;
        let before = t.sessions.len();
        t.sessions.retain(|_, s| s.expires_at >= now && !s.is_revoked);
        Ok((before - t.sessions.len()) as u64)
    }
}
