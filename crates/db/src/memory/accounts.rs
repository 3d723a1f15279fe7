use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tally_core::chart::ensure_no_cycle;
use tally_core::types::DbId;

use super::{MemoryStore, Tables};
use crate::error::{StoreError, StoreResult};
use crate::models::account::{Account, CreateAccount, UpdateAccount};
use crate::stores::AccountStore;

fn ensure_code_free(
    t: &Tables,
    client_id: DbId,
    code: &str,
    exclude_id: Option<DbId>,
) -> StoreResult<()> {
    let taken = t
        .accounts
        .values()
        .any(|a| a.client_id == client_id && a.code == code && Some(a.id) != exclude_id);
    if taken {
        return Err(StoreError::conflict(format!(
            "Account code '{code}' already exists for this client"
        )));
    }
    Ok(())
}

fn ensure_parent_in_client(t: &Tables, client_id: DbId, parent_id: DbId) -> StoreResult<()> {
    if t.accounts.get(&parent_id).is_some_and(|p| p.client_id == client_id) {
        Ok(())
    } else {
        Err(StoreError::validation(format!(
            "Parent account {parent_id} does not belong to this client"
        )))
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(
        &self,
        client_id: DbId,
        input: &CreateAccount,
    ) -> StoreResult<Account> {
        let mut t = self.tables.write().await;
        ensure_code_free(&t, client_id, &input.code, None)?;
        if let Some(parent_id) = input.parent_id {
            ensure_parent_in_client(&t, client_id, parent_id)?;
        }
        let now = Utc::now();
        let account = Account {
            id: t.next_id(),
            client_id,
            parent_id: input.parent_id,
            code: input.code.clone(),
            name: input.name.clone(),
            account_type: input.account_type,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        t.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Account>> {
        let t = self.tables.read().await;
        Ok(t.accounts
            .get(&id)
            .filter(|a| a.client_id == client_id)
            .cloned())
    }

    async fn list_accounts(
        &self,
        client_id: DbId,
        include_inactive: bool,
    ) -> StoreResult<Vec<Account>> {
        let t = self.tables.read().await;
        let mut accounts: Vec<Account> = t
            .accounts
            .values()
            .filter(|a| a.client_id == client_id && (include_inactive || a.is_active))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn update_account(
        &self,
        client_id: DbId,
        id: DbId,
        input: &UpdateAccount,
    ) -> StoreResult<Option<Account>> {
        let mut t = self.tables.write().await;
        if !t.accounts.get(&id).is_some_and(|a| a.client_id == client_id) {
            return Ok(None);
        }
        if let Some(code) = &input.code {
            ensure_code_free(&t, client_id, code, Some(id))?;
        }
        if let Some(Some(parent_id)) = input.parent_id {
            ensure_parent_in_client(&t, client_id, parent_id)?;
            let parents: HashMap<DbId, Option<DbId>> = t
                .accounts
                .values()
                .filter(|a| a.client_id == client_id)
                .map(|a| (a.id, a.parent_id))
                .collect();
            ensure_no_cycle(&parents, id, parent_id)?;
        }

        let Some(account) = t.accounts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(code) = &input.code {
            account.code = code.clone();
        }
        if let Some(name) = &input.name {
            account.name = name.clone();
        }
        if let Some(account_type) = input.account_type {
            account.account_type = account_type;
        }
        if let Some(parent_id) = input.parent_id {
            account.parent_id = parent_id;
        }
        if let Some(is_active) = input.is_active {
            account.is_active = is_active;
        }
        account.updated_at = Utc::now();
        Ok(Some(account.clone()))
    }

    async fn deactivate_account(&self, client_id: DbId, id: DbId) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t
            .accounts
            .get_mut(&id)
            .filter(|a| a.client_id == client_id && a.is_active)
        {
            Some(account) => {
                account.is_active = false;
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
