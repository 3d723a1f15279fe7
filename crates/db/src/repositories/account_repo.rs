//! Repository for the `accounts` table (chart of accounts).

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tally_core::chart::ensure_no_cycle;
use tally_core::types::DbId;

use crate::error::{StoreError, StoreResult};
use crate::models::account::{Account, CreateAccount, UpdateAccount};
use crate::stores::AccountStore;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, client_id, parent_id, code, name, account_type, is_active, \
                        created_at, updated_at";

pub struct AccountRepo {
    pool: PgPool,
}

impl AccountRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Reject a parent that does not exist within `client_id`.
async fn ensure_parent_in_client(
    conn: &mut PgConnection,
    client_id: DbId,
    parent_id: DbId,
) -> StoreResult<()> {
    let found: Option<(DbId,)> =
        sqlx::query_as("SELECT id FROM accounts WHERE id = $1 AND client_id = $2")
            .bind(parent_id)
            .bind(client_id)
            .fetch_optional(&mut *conn)
            .await?;
    if found.is_none() {
        return Err(StoreError::validation(format!(
            "Parent account {parent_id} does not belong to this client"
        )));
    }
    Ok(())
}

#[async_trait]
impl AccountStore for AccountRepo {
    async fn create_account(
        &self,
        client_id: DbId,
        input: &CreateAccount,
    ) -> StoreResult<Account> {
        let mut tx = self.pool.begin().await?;
        if let Some(parent_id) = input.parent_id {
            ensure_parent_in_client(&mut tx, client_id, parent_id).await?;
        }

        let query = format!(
            "INSERT INTO accounts (client_id, parent_id, code, name, account_type)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(client_id)
            .bind(input.parent_id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(input.account_type.as_str())
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(account)
    }

    async fn find_account(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Account>> {
        let query = format!("SELECT {COLUMNS} FROM accounts WHERE id = $1 AND client_id = $2");
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn list_accounts(
        &self,
        client_id: DbId,
        include_inactive: bool,
    ) -> StoreResult<Vec<Account>> {
        let query = format!(
            "SELECT {COLUMNS} FROM accounts
             WHERE client_id = $1 AND ($2 OR is_active)
             ORDER BY code"
        );
        let accounts = sqlx::query_as::<_, Account>(&query)
            .bind(client_id)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;
        Ok(accounts)
    }

    /// Parent changes are checked against the whole chart under a lock on
    /// the client's accounts so two concurrent moves cannot form a cycle.
    async fn update_account(
        &self,
        client_id: DbId,
        id: DbId,
        input: &UpdateAccount,
    ) -> StoreResult<Option<Account>> {
        let mut tx = self.pool.begin().await?;

        let parents: HashMap<DbId, Option<DbId>> = sqlx::query_as::<_, (DbId, Option<DbId>)>(
            "SELECT id, parent_id FROM accounts WHERE client_id = $1 FOR UPDATE",
        )
        .bind(client_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();

        if !parents.contains_key(&id) {
            return Ok(None);
        }

        if let Some(Some(parent_id)) = input.parent_id {
            if !parents.contains_key(&parent_id) {
                return Err(StoreError::validation(format!(
                    "Parent account {parent_id} does not belong to this client"
                )));
            }
            ensure_no_cycle(&parents, id, parent_id)?;
        }

        let query = format!(
            "UPDATE accounts SET
                code = COALESCE($3, code),
                name = COALESCE($4, name),
                account_type = COALESCE($5, account_type),
                parent_id = CASE WHEN $6 THEN $7 ELSE parent_id END,
                is_active = COALESCE($8, is_active)
             WHERE id = $1 AND client_id = $2
             RETURNING {COLUMNS}"
        );
        let account = sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(client_id)
            .bind(&input.code)
            .bind(&input.name)
            .bind(input.account_type.map(|t| t.as_str()))
            .bind(input.parent_id.is_some())
            .bind(input.parent_id.flatten())
            .bind(input.is_active)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(account)
    }

    async fn deactivate_account(&self, client_id: DbId, id: DbId) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET is_active = false
             WHERE id = $1 AND client_id = $2 AND is_active = true",
        )
        .bind(id)
        .bind(client_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
